//! Label smoothing with a pairwise MRF.
//!
//! [`build_factor_graph`] turns the cell graph and a fitted
//! [`MixtureModel`](crate::estimator::MixtureModel) into a discrete factor
//! graph with Gaussian unaries and Potts pairwise terms;
//! [`BeliefPropagation`] computes marginals or a MAP labeling on it.

mod bp;
mod factor_graph;
mod options;
mod potential;

pub use bp::{BeliefPropagation, BpResult};
pub use factor_graph::{build_factor_graph, FactorGraph, FactorOptions, PairwiseFactor};
pub use options::{BpOptions, BpStatus, InferenceMode, Schedule};
pub use potential::{Domain, Potential};
