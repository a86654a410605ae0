use serde::{Deserialize, Serialize};

/// Representation of potential values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Values are log-potentials.
    #[default]
    Log,
    /// Values are non-negative potentials.
    Linear,
}

/// Unary potential of one discrete variable.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Potential {
    pub domain: Domain,
    pub values: Vec<f64>,
}

impl Potential {
    pub fn from_log(log_values: Vec<f64>, domain: Domain) -> Self {
        match domain {
            Domain::Log => Self {
                domain,
                values: log_values,
            },
            Domain::Linear => {
                // Scaled by the maximum so small likelihoods do not flush to zero.
                let max = log_values
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max);
                let shift = if max.is_finite() { max } else { 0.0 };
                Self {
                    domain,
                    values: log_values.iter().map(|l| (l - shift).exp()).collect(),
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn log_values(&self) -> Vec<f64> {
        match self.domain {
            Domain::Log => self.values.clone(),
            Domain::Linear => self.values.iter().map(|v| v.ln()).collect(),
        }
    }
}
