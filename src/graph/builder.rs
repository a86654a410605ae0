use super::undirected::Graph;
use crate::dem::{Cell, Dem};
use log::debug;
use serde::{Deserialize, Serialize};

/// Grid neighbourhood used when linking cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Four,
    Eight,
}

/// Dissimilarity between the height statistics of two adjacent cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMetric {
    /// `|mean(u) - mean(v)|`.
    AbsMeanDifference,
    /// `|median(u) - median(v)|` from the cell histograms.
    AbsMedianDifference,
    /// Mean difference scaled by the pooled standard deviation,
    /// `|mean(u) - mean(v)| / sqrt(var(u) + var(v) + sigma0^2)`.
    NormalizedMeanDifference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphOptions {
    pub connectivity: Connectivity,
    pub metric: WeightMetric,
    /// Noise floor (metres) added to the pooled deviation of the normalized metric.
    pub sigma0: f64,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Four,
            metric: WeightMetric::AbsMeanDifference,
            sigma0: 0.02,
        }
    }
}

// Forward half-neighbourhoods: every undirected pair is visited exactly once
// when scanning cells in linear order.
const FORWARD_4: [(isize, isize); 2] = [(1, 0), (0, 1)];
const FORWARD_8: [(isize, isize); 4] = [(1, 0), (-1, 1), (0, 1), (1, 1)];

/// Builds the cell graph: one vertex per valid cell and one edge per pair of
/// adjacent valid cells, weighted by `options.metric`.
pub fn build_graph(dem: &Dem, options: &GraphOptions) -> Graph {
    let [nx, ny] = dem.dims();
    let mut graph = Graph::with_vertices(dem.valid_indices());
    let offsets: &[(isize, isize)] = match options.connectivity {
        Connectivity::Four => &FORWARD_4,
        Connectivity::Eight => &FORWARD_8,
    };
    let cells = dem.cells();
    for lin in dem.valid_indices() {
        let i = (lin % nx) as isize;
        let j = (lin / nx) as isize;
        for &(di, dj) in offsets {
            let ni = i + di;
            let nj = j + dj;
            if ni < 0 || nj < 0 || ni >= nx as isize || nj >= ny as isize {
                continue;
            }
            let other = nj as usize * nx + ni as usize;
            if !cells[other].is_valid() {
                continue;
            }
            let w = edge_weight(&cells[lin], &cells[other], options);
            // Both endpoints are vertices by construction.
            if let Err(err) = graph.insert_edge(lin, other, w) {
                debug!("graph: skipped edge {{{lin}, {other}}}: {err}");
            }
        }
    }
    debug!(
        "graph: {} vertices, {} edges ({:?}, {:?})",
        graph.num_vertices(),
        graph.num_edges(),
        options.connectivity,
        options.metric
    );
    graph
}

/// Dissimilarity between two valid cells under `options.metric`.
pub fn edge_weight(a: &Cell, b: &Cell, options: &GraphOptions) -> f64 {
    match options.metric {
        WeightMetric::AbsMeanDifference => {
            (a.mean().unwrap_or(0.0) - b.mean().unwrap_or(0.0)).abs()
        }
        WeightMetric::AbsMedianDifference => {
            (a.median().unwrap_or(0.0) - b.median().unwrap_or(0.0)).abs()
        }
        WeightMetric::NormalizedMeanDifference => {
            let diff = (a.mean().unwrap_or(0.0) - b.mean().unwrap_or(0.0)).abs();
            let pooled = a.variance().unwrap_or(0.0)
                + b.variance().unwrap_or(0.0)
                + options.sigma0 * options.sigma0;
            if pooled > 0.0 {
                diff / pooled.sqrt()
            } else {
                diff
            }
        }
    }
}
