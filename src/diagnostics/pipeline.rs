use super::stages::{DemStage, EstimationStage, GraphStage, InferenceStage, SegmentationStage};
use super::timing::TimingBreakdown;
use crate::dem::Dem;
use crate::estimator::MixtureModel;
use crate::factor::BpResult;
use crate::segment::Segmentation;
use crate::types::DetectionSummary;
use serde::Serialize;

/// Result of [`CurbDetector::process`](crate::CurbDetector::process).
///
/// The DEM carries the final per-cell labels and responsibilities.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub summary: DetectionSummary,
    pub dem: Dem,
    pub segmentation: Segmentation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<MixtureModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labeling: Option<BpResult>,
    pub trace: PipelineTrace,
}

impl DetectionReport {
    /// Final label of a cell, if the labeling stage ran.
    pub fn label_of(&self, cell: usize) -> Option<usize> {
        self.dem.cell_at(cell).ok()?.label
    }
}

/// Stage-by-stage account of one run. Stages that did not run are absent.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub input: InputDescriptor,
    pub timings: TimingBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dem: Option<DemStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<SegmentationStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimation: Option<EstimationStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference: Option<InferenceStage>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub num_points: usize,
    /// `true` when the extent came from the cloud rather than the parameters.
    pub auto_bounds: bool,
}
