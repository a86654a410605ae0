#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod types;

// Stage modules, usable on their own.
pub mod dem;
pub mod estimator;
pub mod factor;
pub mod graph;
pub mod numeric;
pub mod segment;

// Tooling support.
pub mod config;
pub mod io;

// --- High-level re-exports -------------------------------------------------

// Main entry points: detector + parameters.
pub use crate::pipeline::{CurbDetector, PipelineParams};
pub use crate::types::{DetectionSummary, Point};

// Full result returned by the detector.
pub use crate::diagnostics::{DetectionReport, PipelineTrace};

pub use crate::error::{Error, Result};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use curb_detector::prelude::*;
///
/// # fn main() -> curb_detector::Result<()> {
/// let points: Vec<Point> = (0..400)
///     .map(|n| {
///         let (x, y) = ((n % 20) as f64 * 0.05, (n / 20) as f64 * 0.05);
///         Point::new(x, y, if x < 0.5 { 0.0 } else { 0.15 })
///     })
///     .collect();
///
/// let mut det = CurbDetector::new(PipelineParams::default())?;
/// let report = det.process(&points)?;
/// println!(
///     "regions={} labeled={} latency_ms={:.3}",
///     report.summary.regions,
///     report.labeling.is_some(),
///     report.summary.latency_ms
/// );
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::estimator::MixtureEstimator;
    pub use crate::types::Point;
    pub use crate::{CurbDetector, DetectionReport, PipelineParams};
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    // Stage runners / builders.
    pub use crate::dem::{Dem, DemOptions};
    pub use crate::estimator::{
        observations_from_cells, observations_from_points, BayesEstimator, MixtureEstimator,
        MlEstimator,
    };
    pub use crate::factor::{build_factor_graph, BeliefPropagation, FactorGraph};
    pub use crate::graph::{build_graph, Graph, GraphOptions};
    pub use crate::segment::{segment_graph, SegmentOptions, Segmentation};

    // Structured diagnostics types.
    pub use crate::diagnostics::{
        DemStage, EstimationStage, GraphStage, InferenceStage, InputDescriptor,
        SegmentationStage, StageTiming, TimingBreakdown,
    };
}
