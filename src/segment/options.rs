use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters of the graph segmentation.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Scale parameter `k`; larger values favour coarser regions. Must be > 0.
    pub k: f64,
    /// Regions smaller than this are joined to a neighbour. `0`/`1` disables.
    pub min_size: usize,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            k: 0.5,
            min_size: 0,
        }
    }
}

impl SegmentOptions {
    pub fn new(k: f64) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.k.is_finite() || self.k <= 0.0 {
            return Err(Error::bad_argument(format!(
                "segmentation k must be positive, got {}",
                self.k
            )));
        }
        Ok(())
    }
}
