//! Parameter types configuring the pipeline stages.
//!
//! Every struct deserializes with per-field defaults, so a JSON config only
//! needs to name the knobs it changes.

use crate::dem::DemOptions;
use crate::error::{Error, Result};
use crate::estimator::{BayesPrior, EstimatorOptions};
use crate::factor::{BpOptions, FactorOptions};
use crate::graph::GraphOptions;
use crate::segment::SegmentOptions;
use serde::{Deserialize, Serialize};

/// Fixed XY extent of the DEM.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct GridBounds {
    pub minimum: [f64; 2],
    pub maximum: [f64; 2],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    Ml,
    Bayes,
}

/// What the estimator is fitted on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitInput {
    /// Every raw point, joined with its cell and region.
    #[default]
    Points,
    /// One sample per valid cell (centre, mean height).
    Cells,
}

/// Pipeline-wide parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineParams {
    /// DEM extent; derived from the cloud when absent.
    pub bounds: Option<GridBounds>,
    /// Upper-side padding of a derived extent.
    pub margin: f64,
    /// Cell size along x and y.
    pub resolution: [f64; 2],
    pub dem: DemOptions,
    pub graph: GraphOptions,
    pub segmentation: SegmentOptions,
    pub estimator: EstimatorKind,
    pub estimator_options: EstimatorOptions,
    pub bayes_prior: BayesPrior,
    pub fit_on: FitInput,
    pub factor: FactorOptions,
    pub bp: BpOptions,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            bounds: None,
            margin: 1e-6,
            resolution: [0.1, 0.1],
            dem: DemOptions::default(),
            graph: GraphOptions::default(),
            segmentation: SegmentOptions::default(),
            estimator: EstimatorKind::default(),
            estimator_options: EstimatorOptions::default(),
            bayes_prior: BayesPrior::default(),
            fit_on: FitInput::default(),
            factor: FactorOptions::default(),
            bp: BpOptions::default(),
        }
    }
}

impl PipelineParams {
    /// Checks every stage's options up front.
    pub fn validate(&self) -> Result<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(Error::bad_argument(format!(
                "margin must be non-negative, got {}",
                self.margin
            )));
        }
        for (d, r) in self.resolution.iter().enumerate() {
            if !r.is_finite() || *r <= 0.0 {
                return Err(Error::bad_argument(format!(
                    "resolution[{d}] must be positive, got {r}"
                )));
            }
        }
        self.dem.validate()?;
        self.segmentation.validate()?;
        self.estimator_options.validate()?;
        if self.estimator == EstimatorKind::Bayes {
            self.bayes_prior.validate()?;
        }
        self.factor.validate()?;
        self.bp.validate()?;
        Ok(())
    }
}
