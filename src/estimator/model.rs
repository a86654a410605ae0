use super::observation::Observation;
use super::options::RegressionBasis;
use crate::dem::Dem;
use crate::error::{Error, Result};
use crate::numeric::{log_normal, log_sum_exp, normalize_log};
use crate::types::VertexId;
use nalgebra::DVector;
use serde::Serialize;
use std::collections::BTreeMap;

/// One linear-regression component: `z ~ N(φ(x, y)ᵀ β, σ²)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegressionComponent {
    pub weight: f64,
    pub coefficients: DVector<f64>,
    pub variance: f64,
}

impl RegressionComponent {
    pub fn predict(&self, basis: RegressionBasis, position: [f64; 2]) -> f64 {
        basis.features(position).dot(&self.coefficients)
    }

    pub fn log_density(&self, basis: RegressionBasis, position: [f64; 2], z: f64) -> f64 {
        log_normal(z, self.predict(basis, position), self.variance)
    }
}

/// Mixture of linear regressions over the ground plane.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MixtureModel {
    pub basis: RegressionBasis,
    pub components: Vec<RegressionComponent>,
}

impl MixtureModel {
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    /// Per-component `ln w_k + ln N(z | φᵀβ_k, σ_k²)`.
    pub fn joint_log_densities(&self, position: [f64; 2], z: f64) -> Vec<f64> {
        let phi = self.basis.features(position);
        self.components
            .iter()
            .map(|c| c.weight.ln() + log_normal(z, phi.dot(&c.coefficients), c.variance))
            .collect()
    }

    fn component(&self, k: usize) -> Result<&RegressionComponent> {
        self.components
            .get(k)
            .ok_or_else(|| Error::out_of_bound(format!("component {k} of {}", self.components.len())))
    }

    /// Mean height of component `k` at `position`.
    pub fn predict(&self, k: usize, position: [f64; 2]) -> Result<f64> {
        Ok(self.component(k)?.predict(self.basis, position))
    }

    /// `ln N(z | φᵀβ_k, σ_k²)`, without the mixture weight.
    pub fn log_density(&self, k: usize, position: [f64; 2], z: f64) -> Result<f64> {
        Ok(self.component(k)?.log_density(self.basis, position, z))
    }

    /// Log-likelihood of a single observation under the whole mixture.
    pub fn mixture_log_density(&self, position: [f64; 2], z: f64) -> f64 {
        log_sum_exp(&self.joint_log_densities(position, z))
    }

    pub fn log_likelihood(&self, data: &[Observation]) -> f64 {
        data.iter()
            .map(|o| self.mixture_log_density(o.position, o.z))
            .sum()
    }

    /// Posterior component probabilities of one observation.
    pub fn responsibilities(&self, position: [f64; 2], z: f64) -> Vec<f64> {
        let mut log_r = self.joint_log_densities(position, z);
        normalize_log(&mut log_r);
        log_r.into_iter().map(f64::exp).collect()
    }

    /// E-step: fills `out` with one responsibility row per observation and
    /// returns the data log-likelihood under the current parameters.
    pub fn expectation(&self, data: &[Observation], out: &mut Vec<Vec<f64>>) -> f64 {
        out.clear();
        out.reserve(data.len());
        let mut ll = 0.0;
        for o in data {
            let mut log_r = self.joint_log_densities(o.position, o.z);
            ll += normalize_log(&mut log_r);
            out.push(log_r.into_iter().map(f64::exp).collect());
        }
        ll
    }

    /// Responsibilities of every valid DEM cell, evaluated at the cell centre
    /// with the cell mean height.
    pub fn cell_responsibilities(&self, dem: &Dem) -> BTreeMap<VertexId, Vec<f64>> {
        dem.valid_indices()
            .filter_map(|v| {
                let centre = dem.centre_at(v).ok()?;
                let mean = dem.cell_at(v).ok()?.mean()?;
                Some((v, self.responsibilities(centre, mean)))
            })
            .collect()
    }

    /// Rescales the weights to sum to one. No-op for an all-zero mass.
    pub(crate) fn normalize_weights(&mut self) {
        let total: f64 = self.components.iter().map(|c| c.weight).sum();
        if total > 0.0 && total.is_finite() {
            for c in &mut self.components {
                c.weight /= total;
            }
        }
    }
}
