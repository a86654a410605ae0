//! End-to-end curb labeling pipeline.
//!
//! Stages
//! - DEM: bin the cloud into cells (extent from parameters or the cloud).
//! - Graph: connect adjacent valid cells, weighted by height dissimilarity.
//! - Segmentation: greedy graph merging into height-consistent regions.
//! - Estimation: mixture of linear regressions seeded from the regions.
//! - Labeling: Potts MRF over the cells solved with belief propagation.
//!
//! ```no_run
//! use curb_detector::{CurbDetector, PipelineParams};
//! use curb_detector::types::Point;
//!
//! # fn example(points: Vec<Point>) -> curb_detector::Result<()> {
//! let mut detector = CurbDetector::new(PipelineParams::default())?;
//! let report = detector.process(&points)?;
//! println!("regions: {}", report.summary.regions);
//! # Ok(())
//! # }
//! ```

mod detector;
pub mod params;

pub use detector::CurbDetector;
pub use params::{EstimatorKind, FitInput, GridBounds, PipelineParams};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::{InferenceMode, Schedule};

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "resolution": [0.5, 0.5],
            "estimator": "bayes",
            "segmentation": { "k": 2.0 },
            "bp": { "schedule": "sequential_max_residual", "mode": "max_product" }
        }"#;
        let params: PipelineParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.resolution, [0.5, 0.5]);
        assert_eq!(params.estimator, EstimatorKind::Bayes);
        assert_eq!(params.segmentation.k, 2.0);
        assert_eq!(params.segmentation.min_size, 0);
        assert_eq!(params.bp.schedule, Schedule::SequentialMaxResidual);
        assert_eq!(params.bp.mode, InferenceMode::MaxProduct);
        assert_eq!(params.bp.max_num_iter, 100);
        assert!(params.bounds.is_none());
        params.validate().unwrap();
    }

    #[test]
    fn invalid_stage_options_fail_construction() {
        let mut params = PipelineParams::default();
        params.segmentation.k = 0.0;
        assert!(CurbDetector::new(params).err().is_some_and(|e| e.is_bad_argument()));

        let mut params = PipelineParams::default();
        params.resolution = [0.0, 1.0];
        assert!(CurbDetector::new(params).err().is_some_and(|e| e.is_bad_argument()));

        let mut params = PipelineParams::default();
        params.bp.damping = 1.5;
        assert!(CurbDetector::new(params).err().is_some_and(|e| e.is_bad_argument()));
    }
}
