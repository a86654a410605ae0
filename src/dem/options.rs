use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Knobs for DEM cell accumulation.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DemOptions {
    /// Minimum number of samples for a cell to count as valid (>= 1).
    pub min_points: usize,
    /// Bin width (metres) of the per-cell height histogram.
    pub histogram_bin_width: f64,
}

impl Default for DemOptions {
    fn default() -> Self {
        Self {
            min_points: 1,
            histogram_bin_width: 0.05,
        }
    }
}

impl DemOptions {
    pub fn validate(&self) -> Result<()> {
        if self.min_points == 0 {
            return Err(Error::bad_argument("min_points must be at least 1"));
        }
        if !self.histogram_bin_width.is_finite() || self.histogram_bin_width <= 0.0 {
            return Err(Error::bad_argument(format!(
                "histogram_bin_width must be positive, got {}",
                self.histogram_bin_width
            )));
        }
        Ok(())
    }
}
