//! Undirected graph over DEM cells.
//!
//! - [`Edge`] / [`EdgeKey`]: unordered vertex pairs with a scalar weight.
//! - [`Graph`]: adjacency-list graph with O(1) amortized insert/remove.
//! - [`build_graph`]: links adjacent valid cells (4- or 8-connectivity) and
//!   weights each edge by a height dissimilarity ([`WeightMetric`]).

mod builder;
mod edge;
mod undirected;

pub use builder::{build_graph, edge_weight, Connectivity, GraphOptions, WeightMetric};
pub use edge::{Edge, EdgeKey};
pub use undirected::Graph;
