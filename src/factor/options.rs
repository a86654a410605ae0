use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Order in which messages are recomputed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// All messages from the previous sweep at once.
    #[default]
    Parallel,
    /// In place, in factor order.
    SequentialFixed,
    /// In place, in a freshly shuffled order every sweep.
    SequentialRandom,
    /// In place, always the message with the largest pending change.
    SequentialMaxResidual,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Marginals.
    #[default]
    SumProduct,
    /// MAP assignment.
    MaxProduct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BpStatus {
    Uninitialized,
    Running,
    Converged,
    MaxIterReached,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BpOptions {
    pub schedule: Schedule,
    pub mode: InferenceMode,
    /// Sweeps before giving up (>= 1).
    pub max_num_iter: usize,
    /// Converged once no normalized message moves by more than this.
    pub tol: f64,
    /// Weight of the previous message in `[0, 1)`.
    pub damping: f64,
    /// Seed of the random schedule.
    pub seed: u64,
}

impl Default for BpOptions {
    fn default() -> Self {
        Self {
            schedule: Schedule::default(),
            mode: InferenceMode::default(),
            max_num_iter: 100,
            tol: 1e-9,
            damping: 0.0,
            seed: 0,
        }
    }
}

impl BpOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_num_iter == 0 {
            return Err(Error::bad_argument("BP max_num_iter must be positive"));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(Error::bad_argument(format!(
                "BP tol must be a non-negative number, got {}",
                self.tol
            )));
        }
        if !(0.0..1.0).contains(&self.damping) {
            return Err(Error::bad_argument(format!(
                "BP damping must lie in [0, 1), got {}",
                self.damping
            )));
        }
        Ok(())
    }
}
