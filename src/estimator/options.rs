use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Regression features of a cell position `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionBasis {
    /// Height is a constant per component: `[1]`.
    Constant,
    /// Height is a plane per component: `[1, x, y]`.
    Planar,
}

impl RegressionBasis {
    pub fn dim(self) -> usize {
        match self {
            RegressionBasis::Constant => 1,
            RegressionBasis::Planar => 3,
        }
    }

    pub fn features(self, position: [f64; 2]) -> nalgebra::DVector<f64> {
        match self {
            RegressionBasis::Constant => nalgebra::DVector::from_element(1, 1.0),
            RegressionBasis::Planar => {
                nalgebra::DVector::from_vec(vec![1.0, position[0], position[1]])
            }
        }
    }
}

/// EM parameters shared by the ML and Bayesian estimators.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EstimatorOptions {
    /// Number of mixture components `K` (>= 1).
    pub num_components: usize,
    pub basis: RegressionBasis,
    /// Upper bound on EM iterations (>= 1).
    pub max_num_iter: usize,
    /// Stop once the log-likelihood gains less than this per iteration.
    pub tol: f64,
    /// Components with a smaller responsibility mass keep their parameters.
    pub min_effective_count: f64,
    /// Lower bound on every component variance.
    pub variance_floor: f64,
    /// Seed of the initialization perturbation.
    pub seed: u64,
    /// Intercept perturbation (in global standard deviations) for components
    /// that could not be seeded from a segmentation region.
    pub init_perturbation: f64,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            num_components: 2,
            basis: RegressionBasis::Planar,
            max_num_iter: 100,
            tol: 1e-6,
            min_effective_count: 2.0,
            variance_floor: 1e-6,
            seed: 7,
            init_perturbation: 1.0,
        }
    }
}

impl EstimatorOptions {
    pub fn validate(&self) -> Result<()> {
        if self.num_components == 0 {
            return Err(Error::bad_argument("num_components must be at least 1"));
        }
        if self.max_num_iter == 0 {
            return Err(Error::bad_argument("max_num_iter must be positive"));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(Error::bad_argument(format!(
                "tol must be a non-negative number, got {}",
                self.tol
            )));
        }
        if !self.variance_floor.is_finite() || self.variance_floor <= 0.0 {
            return Err(Error::bad_argument(format!(
                "variance_floor must be positive, got {}",
                self.variance_floor
            )));
        }
        if !self.min_effective_count.is_finite() || self.min_effective_count < 0.0 {
            return Err(Error::bad_argument(format!(
                "min_effective_count must be non-negative, got {}",
                self.min_effective_count
            )));
        }
        if !self.init_perturbation.is_finite() || self.init_perturbation < 0.0 {
            return Err(Error::bad_argument(format!(
                "init_perturbation must be non-negative, got {}",
                self.init_perturbation
            )));
        }
        Ok(())
    }
}

/// Conjugate prior of the Bayesian estimator.
///
/// Each component gets `β | σ² ~ N(0, σ² · coeff_variance · I)` and
/// `σ² ~ InvGamma(shape, scale)`; the weights get a symmetric
/// `Dirichlet(concentration)`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BayesPrior {
    pub coeff_variance: f64,
    pub shape: f64,
    pub scale: f64,
    pub concentration: f64,
}

impl Default for BayesPrior {
    fn default() -> Self {
        Self {
            coeff_variance: 100.0,
            shape: 1.0,
            scale: 1e-4,
            concentration: 1.0,
        }
    }
}

impl BayesPrior {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("coeff_variance", self.coeff_variance),
            ("shape", self.shape),
            ("scale", self.scale),
            ("concentration", self.concentration),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::bad_argument(format!(
                    "prior {name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}
