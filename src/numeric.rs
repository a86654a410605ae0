//! Small log-domain helpers shared by the estimator and the BP solver.

/// `ln(2π)`.
pub const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Numerically stable `ln(Σ exp(x_i))`; `-inf` for an empty or all `-inf` slice.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Shifts `values` so that `Σ exp(v) == 1`. Returns the removed normalizer.
pub fn normalize_log(values: &mut [f64]) -> f64 {
    let lse = log_sum_exp(values);
    if lse.is_finite() {
        for v in values.iter_mut() {
            *v -= lse;
        }
    } else if !values.is_empty() {
        let uniform = -(values.len() as f64).ln();
        values.iter_mut().for_each(|v| *v = uniform);
    }
    lse
}

/// Shifts `values` so that their maximum is zero (max-product normalization).
pub fn normalize_log_max(values: &mut [f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() {
        for v in values.iter_mut() {
            *v -= max;
        }
    } else {
        values.iter_mut().for_each(|v| *v = 0.0);
    }
    max
}

/// Log-density of `N(y | mean, variance)`.
#[inline]
pub fn log_normal(y: f64, mean: f64, variance: f64) -> f64 {
    let r = y - mean;
    -0.5 * (LN_2PI + variance.ln() + r * r / variance)
}

/// Index of the largest entry; the lowest index wins ties.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if b >= v => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
