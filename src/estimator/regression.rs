use log::warn;
use nalgebra::{DMatrix, DVector};

const EPS: f64 = 1e-12;

/// Weighted normal equations `Σ w φφᵀ β = Σ w φ y` of one regression.
#[derive(Clone, Debug)]
pub(crate) struct NormalEquationAccum {
    pub xtx: DMatrix<f64>,
    pub xty: DVector<f64>,
    pub total_weight: f64,
}

impl NormalEquationAccum {
    pub fn new(dim: usize) -> Self {
        Self {
            xtx: DMatrix::zeros(dim, dim),
            xty: DVector::zeros(dim),
            total_weight: 0.0,
        }
    }

    pub fn accumulate(&mut self, features: &DVector<f64>, y: f64, w: f64) {
        if w <= 0.0 {
            return;
        }
        self.xtx.ger(w, features, features, 1.0);
        self.xty.axpy(w * y, features, 1.0);
        self.total_weight += w;
    }

    /// Solves the normal equations. Cholesky first; a rank-deficient system
    /// falls back to the SVD minimum-norm solution.
    pub fn solve(&self) -> Option<DVector<f64>> {
        solve_spd(&self.xtx, &self.xty)
    }
}

/// Solves `a x = b` for a symmetric positive (semi-)definite `a`.
pub(crate) fn solve_spd(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(chol) = a.clone().cholesky() {
        let x = chol.solve(b);
        if x.iter().all(|v| v.is_finite()) {
            return Some(x);
        }
    }
    warn!(
        "regression: normal equations ({}x{}) not positive definite, using SVD",
        a.nrows(),
        a.ncols()
    );
    let svd = a.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if max_sv <= EPS {
        return None;
    }
    svd.solve(b, max_sv * 1e-10)
        .ok()
        .filter(|x| x.iter().all(|v| v.is_finite()))
}
