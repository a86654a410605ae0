//! Mixture-of-linear-regressions estimators.
//!
//! Heights are explained by `K` regression components over the ground plane
//! (a curb scene is typically road + sidewalk). Two estimators share one EM
//! driver:
//! - [`MlEstimator`]: maximum-likelihood EM with point estimates.
//! - [`BayesEstimator`]: conjugate Normal-Inverse-Gamma / Dirichlet updates
//!   that carry their posterior across `add_points` calls.
//!
//! Both are seeded from the largest segmentation regions.

mod bayes;
mod init;
mod ml;
mod model;
mod observation;
mod options;
pub(crate) mod regression;

pub use bayes::{BayesEstimator, NigPosterior};
pub use ml::MlEstimator;
pub use model::{MixtureModel, RegressionComponent};
pub use observation::{observations_from_cells, observations_from_points, Observation};
pub use options::{BayesPrior, EstimatorOptions, RegressionBasis};

use crate::dem::{Dem, PointMapping};
use crate::error::{Error, Result};
use crate::segment::Segmentation;
use crate::types::Point;
use serde::Serialize;

/// Outcome of the last EM run.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmReport {
    /// M-steps performed.
    pub iterations: usize,
    pub converged: bool,
    /// Data log-likelihood after every E-step.
    pub log_likelihood_trace: Vec<f64>,
}

impl EmReport {
    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.log_likelihood_trace.last().copied()
    }
}

/// Common surface of the ML and Bayesian estimators.
pub trait MixtureEstimator {
    /// Runs EM on `data` and returns the number of iterations performed.
    ///
    /// Fewer than `K` distinct samples leave the estimator invalid and return
    /// `Ok(0)`; non-finite samples are a `BadArgument`.
    fn add_points(&mut self, data: &[Observation]) -> Result<usize>;

    /// Drops every fitted statistic and returns to the configured start.
    fn reset(&mut self);

    fn is_valid(&self) -> bool;

    /// Current parameters, `None` while the estimator is invalid.
    fn model(&self) -> Option<&MixtureModel>;

    /// One row per observation of the last batch.
    fn responsibilities(&self) -> &[Vec<f64>];

    fn report(&self) -> &EmReport;

    /// Convenience entry taking the raw cloud with its DEM binning.
    fn add_cloud(
        &mut self,
        points: &[Point],
        mapping: &PointMapping,
        dem: &Dem,
        segmentation: &Segmentation,
    ) -> Result<usize> {
        let data = observations_from_points(points, mapping, dem, segmentation)?;
        self.add_points(&data)
    }
}

pub(crate) fn check_finite(data: &[Observation]) -> Result<()> {
    match data.iter().position(|o| !o.is_finite()) {
        Some(n) => Err(Error::bad_argument(format!(
            "observation {n} has a non-finite coordinate"
        ))),
        None => Ok(()),
    }
}

/// Alternates `model.expectation` and `m_step` until the log-likelihood gain
/// drops below `options.tol` or `options.max_num_iter` M-steps ran. The
/// responsibilities left in `resp` always match the returned model.
pub(crate) fn run_em<F>(
    model: &mut MixtureModel,
    data: &[Observation],
    options: &EstimatorOptions,
    resp: &mut Vec<Vec<f64>>,
    mut m_step: F,
) -> EmReport
where
    F: FnMut(&mut MixtureModel, &[Vec<f64>]),
{
    let mut report = EmReport::default();
    let mut prev = f64::NEG_INFINITY;
    for iter in 1..=options.max_num_iter {
        let ll = model.expectation(data, resp);
        report.log_likelihood_trace.push(ll);
        if iter > 1 && ll - prev < options.tol {
            report.converged = true;
            break;
        }
        prev = ll;
        m_step(model, resp);
        report.iterations = iter;
    }
    if !report.converged {
        let ll = model.expectation(data, resp);
        report.log_likelihood_trace.push(ll);
        report.converged = ll - prev < options.tol;
    }
    report
}

#[cfg(test)]
mod tests;
