use super::*;
use crate::dem::DemOptions;
use crate::graph::{build_graph, GraphOptions};
use crate::segment::{segment_graph, SegmentOptions};
use approx::assert_relative_eq;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 4×4 scene, one point per cell: x < 2 at height 0, x >= 2 at height 1.
fn step_scene() -> (Vec<Point>, Dem, PointMapping, Segmentation) {
    let mut points = Vec::new();
    for j in 0..4 {
        for i in 0..4 {
            let h = if i < 2 { 0.0 } else { 1.0 };
            points.push(Point::new(i as f64 + 0.5, j as f64 + 0.5, h));
        }
    }
    let mut dem = Dem::new([0.0, 0.0], [4.0, 4.0], [1.0, 1.0], DemOptions::default()).unwrap();
    let mapping = dem.accumulate(&points);
    let graph = build_graph(&dem, &GraphOptions::default());
    let seg = segment_graph(&graph, &SegmentOptions::new(0.5)).unwrap();
    (points, dem, mapping, seg)
}

fn step_observations() -> Vec<Observation> {
    let (points, dem, mapping, seg) = step_scene();
    observations_from_points(&points, &mapping, &dem, &seg).unwrap()
}

fn planar(k: usize) -> EstimatorOptions {
    EstimatorOptions {
        num_components: k,
        basis: RegressionBasis::Planar,
        ..Default::default()
    }
}

fn constant_component(weight: f64, level: f64, variance: f64) -> RegressionComponent {
    RegressionComponent {
        weight,
        coefficients: DVector::from_element(1, level),
        variance,
    }
}

/// Two noisy height levels (0 and 0.3) spread over a 10×10 patch.
fn noisy_levels(seed: u64) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..200)
        .map(|n| {
            let level = if n % 3 == 0 { 0.3 } else { 0.0 };
            let x = rng.gen_range(0.0..10.0);
            let y = rng.gen_range(0.0..10.0);
            Observation::new([x, y], level + rng.gen_range(-0.05..0.05))
        })
        .collect()
}

#[test]
fn ml_recovers_step_planes() {
    let data = step_observations();
    let mut est = MlEstimator::new(planar(2)).unwrap();
    let iterations = est.add_points(&data).unwrap();
    assert!(iterations >= 1);
    assert!(est.is_valid());
    assert!(est.report().converged);

    let model = est.model().unwrap();
    let low = &model.components[0];
    let high = &model.components[1];
    assert_relative_eq!(low.coefficients[0], 0.0, epsilon = 1e-6);
    assert_relative_eq!(high.coefficients[0], 1.0, epsilon = 1e-6);
    for c in [low, high] {
        assert_relative_eq!(c.coefficients[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(c.coefficients[2], 0.0, epsilon = 1e-6);
        assert_relative_eq!(c.variance, 1e-6, max_relative = 1e-6);
        assert_relative_eq!(c.weight, 0.5, epsilon = 1e-9);
    }

    assert_eq!(est.responsibilities().len(), 16);
    for (o, r) in data.iter().zip(est.responsibilities()) {
        let expected = if o.position[0] < 2.0 { 0 } else { 1 };
        assert!(r[expected] > 0.999, "{o:?} -> {r:?}");
    }
}

#[test]
fn ml_log_likelihood_never_decreases() {
    let data = noisy_levels(3);
    let options = EstimatorOptions {
        num_components: 2,
        basis: RegressionBasis::Constant,
        max_num_iter: 200,
        tol: 1e-10,
        ..Default::default()
    };
    let start = MixtureModel {
        basis: RegressionBasis::Constant,
        components: vec![
            constant_component(0.5, 0.05, 0.1),
            constant_component(0.5, 0.25, 0.1),
        ],
    };
    let mut est = MlEstimator::with_initial_model(options, start).unwrap();
    est.add_points(&data).unwrap();

    let trace = &est.report().log_likelihood_trace;
    assert!(trace.len() >= 3);
    for w in trace.windows(2) {
        assert!(w[1] >= w[0] - 1e-9 * w[0].abs(), "{} -> {}", w[0], w[1]);
    }
    let model = est.model().unwrap();
    assert_relative_eq!(model.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    let mut levels: Vec<f64> = model.components.iter().map(|c| c.coefficients[0]).collect();
    levels.sort_by(f64::total_cmp);
    assert!((levels[0] - 0.0).abs() < 0.02, "{levels:?}");
    assert!((levels[1] - 0.3).abs() < 0.02, "{levels:?}");
    for r in est.responsibilities() {
        assert_relative_eq!(r.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn too_few_distinct_points_leave_estimator_invalid() {
    let mut est = MlEstimator::new(planar(2)).unwrap();
    let one = [Observation::new([0.5, 0.5], 1.0)];
    assert_eq!(est.add_points(&one).unwrap(), 0);
    assert!(!est.is_valid());
    assert!(est.model().is_none());

    let repeated = [one[0]; 5];
    assert_eq!(est.add_points(&repeated).unwrap(), 0);
    assert!(!est.is_valid());

    let mut bayes = BayesEstimator::new(planar(2), BayesPrior::default()).unwrap();
    assert_eq!(bayes.add_points(&one).unwrap(), 0);
    assert!(!bayes.is_valid());
}

#[test]
fn invalid_options_are_rejected() {
    let zero_k = EstimatorOptions {
        num_components: 0,
        ..Default::default()
    };
    assert!(MlEstimator::new(zero_k).unwrap_err().is_bad_argument());
    let zero_iter = EstimatorOptions {
        max_num_iter: 0,
        ..Default::default()
    };
    assert!(MlEstimator::new(zero_iter).unwrap_err().is_bad_argument());
    let negative_tol = EstimatorOptions {
        tol: -1.0,
        ..Default::default()
    };
    assert!(MlEstimator::new(negative_tol).unwrap_err().is_bad_argument());
    let no_floor = EstimatorOptions {
        variance_floor: 0.0,
        ..Default::default()
    };
    assert!(
        BayesEstimator::new(no_floor, BayesPrior::default())
            .unwrap_err()
            .is_bad_argument()
    );
    let bad_prior = BayesPrior {
        shape: 0.0,
        ..Default::default()
    };
    assert!(
        BayesEstimator::new(EstimatorOptions::default(), bad_prior)
            .unwrap_err()
            .is_bad_argument()
    );
}

#[test]
fn non_finite_samples_are_rejected() {
    let mut est = MlEstimator::new(planar(1)).unwrap();
    let data = [
        Observation::new([0.0, 0.0], 0.0),
        Observation::new([1.0, 0.0], f64::NAN),
    ];
    assert!(est.add_points(&data).unwrap_err().is_bad_argument());
}

#[test]
fn initial_model_must_match_options() {
    let wrong_k = MixtureModel {
        basis: RegressionBasis::Constant,
        components: vec![constant_component(1.0, 0.0, 1.0)],
    };
    let options = EstimatorOptions {
        num_components: 2,
        basis: RegressionBasis::Constant,
        ..Default::default()
    };
    assert!(MlEstimator::with_initial_model(options.clone(), wrong_k)
        .unwrap_err()
        .is_bad_argument());

    let zero_variance = MixtureModel {
        basis: RegressionBasis::Constant,
        components: vec![
            constant_component(0.5, 0.0, 0.0),
            constant_component(0.5, 1.0, 1.0),
        ],
    };
    assert!(MlEstimator::with_initial_model(options, zero_variance)
        .unwrap_err()
        .is_bad_argument());
}

#[test]
fn starved_component_keeps_its_parameters() {
    let data: Vec<Observation> = (0..10)
        .map(|i| Observation::new([i as f64, 0.0], 0.01 * (i % 3) as f64))
        .collect();
    let options = EstimatorOptions {
        num_components: 2,
        basis: RegressionBasis::Constant,
        min_effective_count: 2.0,
        ..Default::default()
    };
    let start = MixtureModel {
        basis: RegressionBasis::Constant,
        components: vec![
            constant_component(0.5, 0.0, 1.0),
            constant_component(0.5, 100.0, 1.0),
        ],
    };
    let mut est = MlEstimator::with_initial_model(options, start).unwrap();
    est.add_points(&data).unwrap();
    let model = est.model().unwrap();
    assert_eq!(model.components[1].coefficients[0], 100.0);
    assert_eq!(model.components[1].variance, 1.0);
    assert!(model.components[1].weight < 1e-9);
    assert_relative_eq!(model.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(model.components[0].coefficients[0], 0.009, epsilon = 1e-9);
}

#[test]
fn reset_clears_ml_state() {
    let mut est = MlEstimator::new(planar(2)).unwrap();
    est.add_points(&step_observations()).unwrap();
    assert!(est.is_valid());
    est.reset();
    assert!(!est.is_valid());
    assert!(est.model().is_none());
    assert!(est.responsibilities().is_empty());
    assert_eq!(est.report().iterations, 0);
}

#[test]
fn add_cloud_matches_add_points() {
    let (points, dem, mapping, seg) = step_scene();
    let mut a = MlEstimator::new(planar(2)).unwrap();
    let mut b = MlEstimator::new(planar(2)).unwrap();
    let ia = a.add_cloud(&points, &mapping, &dem, &seg).unwrap();
    let ib = b.add_points(&step_observations()).unwrap();
    assert_eq!(ia, ib);
    assert_eq!(a.model(), b.model());
}

#[test]
fn bayes_recovers_step_planes() {
    let mut est = BayesEstimator::new(planar(2), BayesPrior::default()).unwrap();
    est.add_points(&step_observations()).unwrap();
    assert!(est.is_valid());
    let model = est.model().unwrap();
    // The coefficient prior shrinks the fit; region centroids stay on level.
    assert_relative_eq!(model.predict(0, [1.0, 2.0]).unwrap(), 0.0, epsilon = 1e-2);
    assert_relative_eq!(model.predict(1, [3.0, 2.0]).unwrap(), 1.0, epsilon = 1e-2);
    assert_relative_eq!(model.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    // Dirichlet(1) + 8 samples each.
    assert_relative_eq!(model.components[0].weight, 0.5, epsilon = 1e-6);
    for c in &model.components {
        assert!(c.variance >= 1e-6);
        assert!(c.variance < 0.01);
    }
    for p in est.posterior() {
        assert_relative_eq!(p.shape, 1.0 + 4.0, epsilon = 1e-6);
        assert_relative_eq!(p.concentration, 1.0 + 8.0, epsilon = 1e-6);
    }
}

#[test]
fn bayes_accumulates_batches() {
    let data = step_observations();
    let (first, second): (Vec<Observation>, Vec<Observation>) =
        data.iter().copied().partition(|o| o.position[1] < 2.0);

    let mut est = BayesEstimator::new(planar(2), BayesPrior::default()).unwrap();
    est.add_points(&first).unwrap();
    assert_eq!(est.batches(), 1);
    let shape_after_first: Vec<f64> = est.posterior().iter().map(|p| p.shape).collect();
    assert_eq!(est.prior(), est.posterior());

    est.add_points(&second).unwrap();
    assert_eq!(est.batches(), 2);
    for (p, before) in est.posterior().iter().zip(&shape_after_first) {
        assert!(p.shape > *before);
        assert_relative_eq!(p.shape, 1.0 + 4.0, epsilon = 1e-6);
    }

    let mut once = BayesEstimator::new(planar(2), BayesPrior::default()).unwrap();
    once.add_points(&data).unwrap();
    let split = est.model().unwrap();
    let whole = once.model().unwrap();
    for k in 0..2 {
        for centre in [[0.5, 0.5], [1.5, 2.5], [3.5, 3.5]] {
            assert_relative_eq!(
                split.predict(k, centre).unwrap(),
                whole.predict(k, centre).unwrap(),
                epsilon = 1e-6
            );
        }
    }
}

#[test]
fn bayes_small_batch_is_invalid_but_keeps_the_posterior() {
    let data = step_observations();
    let (first, second): (Vec<Observation>, Vec<Observation>) =
        data.iter().copied().partition(|o| o.position[1] < 2.0);

    let mut est = BayesEstimator::new(planar(2), BayesPrior::default()).unwrap();
    est.add_points(&first).unwrap();
    assert!(est.is_valid());
    let posterior = est.posterior().to_vec();

    let lone = [Observation::new([0.5, 0.5], 0.0)];
    assert_eq!(est.add_points(&lone).unwrap(), 0);
    assert!(!est.is_valid());
    assert!(est.model().is_none());
    assert!(est.responsibilities().is_empty());
    assert_eq!(est.posterior(), posterior.as_slice());
    assert_eq!(est.batches(), 1);

    // The next batch continues from the kept posterior.
    est.add_points(&second).unwrap();
    assert!(est.is_valid());
    assert_eq!(est.batches(), 2);
    for p in est.posterior() {
        assert_relative_eq!(p.shape, 1.0 + 4.0, epsilon = 1e-6);
    }
}

#[test]
fn bayes_reset_restores_configured_prior() {
    let fresh = BayesEstimator::new(planar(2), BayesPrior::default()).unwrap();
    let mut est = fresh.clone();
    est.add_points(&step_observations()).unwrap();
    assert_ne!(est.prior(), fresh.prior());
    est.reset();
    assert_eq!(est.prior(), fresh.prior());
    assert_eq!(est.posterior(), fresh.posterior());
    assert!(!est.is_valid());
    assert_eq!(est.batches(), 0);
    assert!(est.model().is_none());
}

#[test]
fn cell_responsibilities_follow_the_step() {
    let (_, dem, _, _) = step_scene();
    let mut est = MlEstimator::new(planar(2)).unwrap();
    est.add_points(&step_observations()).unwrap();
    let cells = est.model().unwrap().cell_responsibilities(&dem);
    assert_eq!(cells.len(), 16);
    for (&v, r) in &cells {
        let idx = dem.index_from_linear(v).unwrap();
        let expected = if idx.i < 2 { 0 } else { 1 };
        assert!(r[expected] > 0.999);
    }
}
