mod common;

use approx::assert_relative_eq;
use common::*;
use curb_detector::estimator::{MixtureEstimator, RegressionBasis};
use curb_detector::factor::BpStatus;
use curb_detector::pipeline::{EstimatorKind, GridBounds};
use curb_detector::{CurbDetector, DetectionReport, PipelineParams, Point};

fn step_params() -> PipelineParams {
    let mut params = PipelineParams {
        bounds: Some(GridBounds {
            minimum: [0.0, 0.0],
            maximum: [4.0, 4.0],
        }),
        resolution: [1.0, 1.0],
        ..Default::default()
    };
    params.segmentation.k = 0.5;
    params.estimator_options.num_components = 2;
    params.factor.strength = 10.0;
    params
}

fn curb_params(estimator: EstimatorKind) -> PipelineParams {
    let mut params = PipelineParams {
        bounds: Some(GridBounds {
            minimum: [0.0, 0.0],
            maximum: [4.0, 3.0],
        }),
        resolution: [CURB_CELL, CURB_CELL],
        estimator,
        ..Default::default()
    };
    params.segmentation.k = 0.5;
    params.estimator_options.basis = RegressionBasis::Planar;
    params.factor.strength = 2.0;
    params
}

/// Every cell left of the step carries one label, every cell right of it the other.
fn assert_split_by_column(report: &DetectionReport, nx: usize, right: impl Fn(usize) -> bool) {
    let cells = report.dem.cells();
    let left_label = cells[0].label.expect("cell 0 labeled");
    let right_label = cells[nx - 1].label.expect("last column labeled");
    assert_ne!(left_label, right_label);
    for (linear, cell) in cells.iter().enumerate() {
        let expected = if right(linear % nx) {
            right_label
        } else {
            left_label
        };
        assert_eq!(cell.label, Some(expected), "cell {linear}");
    }
}

#[test]
fn step_scene_segments_fits_and_labels() {
    init_logging();
    let mut detector = CurbDetector::new(step_params()).unwrap();
    let report = detector.process(&step_cloud()).unwrap();

    assert_eq!(report.summary.valid_cells, 16);
    assert_eq!(report.summary.edges, 24);
    assert_eq!(report.summary.regions, 2);
    let seg = &report.segmentation;
    for j in 0..4 {
        for i in 0..4 {
            let same = seg.component_of(j * 4 + i) == seg.component_of(if i < 2 { 0 } else { 3 });
            assert!(same, "cell ({i}, {j}) in the wrong region");
        }
    }
    assert_ne!(seg.component_of(0), seg.component_of(3));

    assert!(report.summary.estimator_valid);
    let model = report.model.as_ref().expect("model");
    let mut intercepts: Vec<f64> = model.components.iter().map(|c| c.coefficients[0]).collect();
    intercepts.sort_by(f64::total_cmp);
    assert_relative_eq!(intercepts[0], 0.0, epsilon = 1e-6);
    assert_relative_eq!(intercepts[1], 1.0, epsilon = 1e-6);
    for c in &model.components {
        assert!(c.variance <= 1e-5, "variance {}", c.variance);
    }

    let labeling = report.labeling.as_ref().expect("labeling ran");
    assert_eq!(labeling.status, BpStatus::Converged);
    assert_split_by_column(&report, 4, |i| i >= 2);

    // Smoothing agrees with the per-cell maximum responsibility.
    for cell in report.dem.cells() {
        let r = cell.responsibilities.as_ref().expect("responsibilities");
        let best = (0..r.len()).max_by(|&a, &b| r[a].total_cmp(&r[b])).unwrap();
        assert_eq!(cell.label, Some(best));
    }
    // The label points at the component predicting the cell's height.
    let right_label = report.dem.cells()[3].label.unwrap();
    assert_relative_eq!(
        model.predict(right_label, [3.5, 0.5]).unwrap(),
        1.0,
        epsilon = 1e-6
    );

    let stages: Vec<&str> = report
        .trace
        .timings
        .stages
        .iter()
        .map(|s| s.label.as_str())
        .collect();
    assert_eq!(stages, ["dem", "graph", "segmentation", "estimation", "labeling"]);
    let timings = &report.trace.timings;
    assert!(timings.stage("labeling").is_some());
    assert!(timings.stage("refinement").is_none());
    assert!(timings.staged_ms() <= timings.total_ms + 1e-9);
}

#[test]
fn single_point_cloud_leaves_estimator_invalid() {
    init_logging();
    let mut detector = CurbDetector::new(PipelineParams::default()).unwrap();
    let report = detector.process(&[Point::new(1.0, 2.0, 0.3)]).unwrap();

    assert_eq!(report.summary.valid_cells, 1);
    assert_eq!(report.summary.edges, 0);
    assert_eq!(report.segmentation.num_components(), 1);
    assert_eq!(report.segmentation.components[0].size(), 1);

    assert!(!report.summary.estimator_valid);
    assert!(!detector.estimator().is_valid());
    assert!(report.model.is_none());
    assert!(report.labeling.is_none());
    assert!(report.trace.inference.is_none());
    assert!(report.dem.cells().iter().all(|c| c.label.is_none()));
    assert!(!report.trace.estimation.as_ref().unwrap().valid);
}

#[test]
fn empty_cloud_needs_explicit_bounds() {
    let mut detector = CurbDetector::new(PipelineParams::default()).unwrap();
    assert!(detector.process(&[]).unwrap_err().is_bad_argument());

    let mut detector = CurbDetector::new(step_params()).unwrap();
    let report = detector.process(&[]).unwrap();
    assert_eq!(report.summary.valid_cells, 0);
    assert_eq!(report.summary.regions, 0);
    assert!(report.labeling.is_none());
}

#[test]
fn points_outside_fixed_bounds_are_counted_not_binned() {
    let mut cloud = step_cloud();
    cloud.push(Point::new(10.0, 0.5, 5.0));
    cloud.push(Point::new(-1.0, 0.5, 5.0));
    let mut detector = CurbDetector::new(step_params()).unwrap();
    let report = detector.process(&cloud).unwrap();
    assert_eq!(report.trace.dem.as_ref().unwrap().outside_points, 2);
    assert_eq!(report.summary.valid_cells, 16);
    assert_eq!(report.summary.regions, 2);
}

#[test]
fn curb_scene_recovers_road_and_sidewalk_planes() {
    init_logging();
    let mut detector = CurbDetector::new(curb_params(EstimatorKind::Ml)).unwrap();
    let report = detector.process(&curb_cloud()).unwrap();

    assert_eq!(report.summary.valid_cells, CURB_NX * CURB_NY);
    assert_eq!(report.summary.regions, 2);
    assert!(report.summary.estimator_valid);
    assert!(report.summary.bp_converged);
    assert_split_by_column(&report, CURB_NX, is_sidewalk);

    let model = report.model.as_ref().unwrap();
    let sidewalk = report.dem.cells()[CURB_NX - 1].label.unwrap();
    let road = 1 - sidewalk;
    let c = &model.components[sidewalk].coefficients;
    assert_relative_eq!(c[0], CURB_HEIGHT, epsilon = 1e-6);
    assert_relative_eq!(c[1], 0.0, epsilon = 1e-6);
    assert_relative_eq!(c[2], CURB_SLOPE, epsilon = 1e-6);
    let c = &model.components[road].coefficients;
    assert_relative_eq!(c[0], 0.0, epsilon = 1e-6);
    assert_relative_eq!(c[2], CURB_SLOPE, epsilon = 1e-6);
    for c in &model.components {
        assert_relative_eq!(c.weight, 0.5, epsilon = 1e-6);
    }
}

#[test]
fn bayes_pipeline_carries_its_posterior_across_clouds() {
    init_logging();
    let mut detector = CurbDetector::new(curb_params(EstimatorKind::Bayes)).unwrap();
    let cloud = curb_cloud();

    let first = detector.process(&cloud).unwrap();
    assert!(first.summary.estimator_valid);
    assert_eq!(first.trace.estimation.as_ref().unwrap().estimator, "bayes");
    assert_split_by_column(&first, CURB_NX, is_sidewalk);

    let second = detector.process(&cloud).unwrap();
    assert!(second.summary.estimator_valid);
    assert_split_by_column(&second, CURB_NX, is_sidewalk);

    let model = second.model.as_ref().unwrap();
    let sidewalk = second.dem.cells()[CURB_NX - 1].label.unwrap();
    let centre = [3.0, 1.5];
    assert_relative_eq!(
        model.predict(sidewalk, centre).unwrap(),
        CURB_HEIGHT + CURB_SLOPE * centre[1],
        epsilon = 1e-2
    );
    assert_relative_eq!(
        model.predict(1 - sidewalk, [1.0, 1.5]).unwrap(),
        CURB_SLOPE * 1.5,
        epsilon = 1e-2
    );

    // Too few distinct points: invalid, labeling skipped.
    let third = detector.process(&[Point::new(1.0, 1.0, 0.02)]).unwrap();
    assert!(!third.summary.estimator_valid);
    assert!(third.labeling.is_none());

    // The posterior survived the small batch.
    let fourth = detector.process(&cloud).unwrap();
    assert!(fourth.summary.estimator_valid);
    assert_split_by_column(&fourth, CURB_NX, is_sidewalk);

    detector.reset();
    assert!(!detector.estimator().is_valid());
    let fresh = detector.process(&[Point::new(1.0, 1.0, 0.02)]).unwrap();
    assert!(!fresh.summary.estimator_valid);
}

#[test]
fn report_serializes_to_json() {
    let mut detector = CurbDetector::new(step_params()).unwrap();
    let report = detector.process(&step_cloud()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["summary"]["validCells"], 16);
    assert_eq!(json["summary"]["regions"], 2);
    assert_eq!(json["summary"]["estimatorValid"], true);
    assert!(json["model"].is_object());
    assert!(json["labeling"].is_object());
    assert!(json["trace"]["timings"]["stages"].is_array());
    assert!(json["trace"]["inference"].is_object());
}
