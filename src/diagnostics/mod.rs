//! Serializable diagnostics of a pipeline run.
//!
//! `DetectionReport` is what [`CurbDetector::process`](crate::CurbDetector)
//! returns: the labeled DEM and stage outputs plus a `PipelineTrace` with one
//! report per stage that ran and the stage timings.

pub mod pipeline;
pub mod stages;
pub mod timing;

pub use pipeline::{DetectionReport, InputDescriptor, PipelineTrace};
pub use stages::{DemStage, EstimationStage, GraphStage, InferenceStage, SegmentationStage};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
