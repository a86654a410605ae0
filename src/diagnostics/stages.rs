use crate::dem::Dem;
use crate::estimator::EmReport;
use crate::factor::{BpResult, BpStatus, FactorGraph};
use crate::graph::Graph;
use crate::segment::Segmentation;
use serde::Serialize;

/// Extent and occupancy of the DEM.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemStage {
    pub dims: [usize; 2],
    pub minimum: [f64; 2],
    pub maximum: [f64; 2],
    pub resolution: [f64; 2],
    pub total_cells: usize,
    pub valid_cells: usize,
    pub outside_points: usize,
    /// Lowest and highest valid cell mean.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_range: Option<[f64; 2]>,
    pub elapsed_ms: f64,
}

impl DemStage {
    pub fn describe(dem: &Dem, outside_points: usize, elapsed_ms: f64) -> Self {
        let height_range = dem
            .cells()
            .iter()
            .filter(|c| c.is_valid())
            .filter_map(|c| c.mean())
            .fold(None, |acc: Option<[f64; 2]>, h| match acc {
                None => Some([h, h]),
                Some([lo, hi]) => Some([lo.min(h), hi.max(h)]),
            });
        Self {
            dims: dem.dims(),
            minimum: dem.minimum(),
            maximum: dem.maximum(),
            resolution: dem.resolution(),
            total_cells: dem.len(),
            valid_cells: dem.num_valid(),
            outside_points,
            height_range,
            elapsed_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStage {
    pub vertices: usize,
    pub edges: usize,
    pub mean_weight: f64,
    pub max_weight: f64,
    pub elapsed_ms: f64,
}

impl GraphStage {
    pub fn describe(graph: &Graph, elapsed_ms: f64) -> Self {
        let edges = graph.edges();
        let max_weight = edges.iter().map(|e| e.weight).fold(0.0, f64::max);
        let mean_weight = if edges.is_empty() {
            0.0
        } else {
            edges.iter().map(|e| e.weight).sum::<f64>() / edges.len() as f64
        };
        Self {
            vertices: graph.num_vertices(),
            edges: edges.len(),
            mean_weight,
            max_weight,
            elapsed_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationStage {
    pub k: f64,
    pub regions: usize,
    pub singletons: usize,
    /// Sizes of the largest regions, largest first.
    pub largest_sizes: Vec<usize>,
    pub elapsed_ms: f64,
}

impl SegmentationStage {
    pub fn describe(seg: &Segmentation, k: f64, elapsed_ms: f64) -> Self {
        let sizes = seg.region_sizes();
        Self {
            k,
            regions: seg.num_components(),
            singletons: sizes.iter().filter(|&&s| s == 1).count(),
            largest_sizes: seg.largest(5).into_iter().map(|id| sizes[id]).collect(),
            elapsed_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationStage {
    pub estimator: String,
    pub observations: usize,
    pub valid: bool,
    pub em: EmReport,
    pub elapsed_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceStage {
    pub status: BpStatus,
    pub iterations: usize,
    pub max_diff: f64,
    pub variables: usize,
    pub factors: usize,
    /// Cells per final label.
    pub label_counts: Vec<usize>,
    pub elapsed_ms: f64,
}

impl InferenceStage {
    pub fn describe(fg: &FactorGraph, result: &BpResult, elapsed_ms: f64) -> Self {
        let mut label_counts = vec![0; fg.num_states()];
        for &l in &result.labels {
            if let Some(c) = label_counts.get_mut(l) {
                *c += 1;
            }
        }
        Self {
            status: result.status,
            iterations: result.iterations,
            max_diff: result.max_diff,
            variables: fg.num_variables(),
            factors: fg.num_factors(),
            label_counts,
            elapsed_ms,
        }
    }
}
