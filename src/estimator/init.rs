use super::model::{MixtureModel, RegressionComponent};
use super::observation::Observation;
use super::options::EstimatorOptions;
use super::regression::NormalEquationAccum;
use log::debug;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Seeds a `K`-component model from the segmentation.
///
/// The `K` largest regions present in `data` each get a least-squares fit.
/// Components without a region are copies of the global fit whose intercept
/// is jittered by `init_perturbation` global standard deviations, drawn from
/// an RNG seeded with `options.seed`.
pub(crate) fn initial_model(data: &[Observation], options: &EstimatorOptions) -> MixtureModel {
    let basis = options.basis;
    let k = options.num_components;
    let floor = options.variance_floor;

    let all: Vec<&Observation> = data.iter().collect();
    let (global_beta, global_var) = fit(&all, options);
    let global_sigma = global_var.sqrt();

    let mut regions: BTreeMap<usize, Vec<&Observation>> = BTreeMap::new();
    for o in data {
        if let Some(r) = o.region {
            regions.entry(r).or_default().push(o);
        }
    }
    let mut ranked: Vec<(usize, Vec<&Observation>)> = regions.into_iter().collect();
    // Stable sort: equal sizes keep ascending region id.
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    ranked.truncate(k);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut components = Vec::with_capacity(k);
    for (_, members) in &ranked {
        let (beta, variance) = fit(members, options);
        components.push(RegressionComponent {
            weight: members.len() as f64 + 1.0,
            coefficients: beta,
            variance,
        });
    }
    let seeded = components.len();
    while components.len() < k {
        let mut beta = global_beta.clone();
        let jitter: f64 = rng.gen_range(-1.0..=1.0);
        beta[0] += jitter * options.init_perturbation * global_sigma;
        components.push(RegressionComponent {
            weight: 1.0,
            coefficients: beta,
            variance: global_var.max(floor),
        });
    }
    debug!(
        "estimator init: {} of {} components seeded from regions, global sigma {:.4}",
        seeded, k, global_sigma
    );

    let mut model = MixtureModel { basis, components };
    model.normalize_weights();
    model
}

/// Unweighted least-squares fit with its floored residual variance.
fn fit(data: &[&Observation], options: &EstimatorOptions) -> (DVector<f64>, f64) {
    let basis = options.basis;
    let mut accum = NormalEquationAccum::new(basis.dim());
    for o in data {
        accum.accumulate(&basis.features(o.position), o.z, 1.0);
    }
    let beta = accum.solve().unwrap_or_else(|| {
        let mut b = DVector::zeros(basis.dim());
        if !data.is_empty() {
            b[0] = data.iter().map(|o| o.z).sum::<f64>() / data.len() as f64;
        }
        b
    });
    let variance = if data.is_empty() {
        options.variance_floor
    } else {
        data.iter()
            .map(|o| {
                let r = o.z - basis.features(o.position).dot(&beta);
                r * r
            })
            .sum::<f64>()
            / data.len() as f64
    };
    (beta, variance.max(options.variance_floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::RegressionBasis;
    use approx::assert_relative_eq;

    fn options(k: usize) -> EstimatorOptions {
        EstimatorOptions {
            num_components: k,
            basis: RegressionBasis::Constant,
            ..Default::default()
        }
    }

    #[test]
    fn largest_regions_seed_components() {
        let mut data = Vec::new();
        for i in 0..6 {
            data.push(Observation::new([i as f64, 0.0], 0.0).with_region(0));
        }
        for i in 0..3 {
            data.push(Observation::new([i as f64, 1.0], 2.0).with_region(1));
        }
        data.push(Observation::new([9.0, 9.0], 7.0).with_region(2));

        let model = initial_model(&data, &options(2));
        assert_eq!(model.num_components(), 2);
        assert_relative_eq!(model.components[0].coefficients[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(model.components[1].coefficients[0], 2.0, epsilon = 1e-12);
        assert!(model.components[0].weight > model.components[1].weight);
        assert_relative_eq!(model.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn missing_regions_are_perturbed_and_reproducible() {
        let data: Vec<Observation> = (0..10)
            .map(|i| Observation::new([i as f64, 0.0], (i % 2) as f64))
            .collect();
        let a = initial_model(&data, &options(3));
        let b = initial_model(&data, &options(3));
        assert_eq!(a, b);
        assert_ne!(a.components[0].coefficients, a.components[1].coefficients);
        for c in &a.components {
            assert!((c.coefficients[0] - 0.5).abs() <= 0.5 + 1e-12);
            assert!(c.variance >= 1e-6);
        }
    }
}
