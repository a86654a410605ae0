use serde::Serialize;

/// Input LIDAR return `(x, y, z)`; `z` is the height binned into the DEM.
pub type Point = nalgebra::Point3<f64>;

/// Linearized grid index (`j * nx + i`) used as the graph vertex id.
pub type VertexId = usize;

/// Compact per-run summary returned next to the full stage outputs.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub num_points: usize,
    pub valid_cells: usize,
    pub edges: usize,
    pub regions: usize,
    pub estimator_valid: bool,
    pub em_iterations: usize,
    pub bp_iterations: usize,
    pub bp_converged: bool,
    pub latency_ms: f64,
}
