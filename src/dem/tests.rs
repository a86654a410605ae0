use super::*;
use crate::types::Point;

fn unit_dem(nx: f64, ny: f64) -> Dem {
    Dem::new([0.0, 0.0], [nx, ny], [1.0, 1.0], DemOptions::default()).expect("valid grid")
}

#[test]
fn rejects_non_positive_resolution() {
    let err = Dem::new([0.0, 0.0], [1.0, 1.0], [0.0, 1.0], DemOptions::default()).unwrap_err();
    assert!(err.is_bad_argument(), "unexpected error {err}");
    let err = Dem::new([0.0, 0.0], [1.0, 1.0], [0.5, -1.0], DemOptions::default()).unwrap_err();
    assert!(err.is_bad_argument());
}

#[test]
fn rejects_empty_extent() {
    let err = Dem::new([1.0, 0.0], [1.0, 2.0], [0.5, 0.5], DemOptions::default()).unwrap_err();
    assert!(err.is_bad_argument());
}

#[test]
fn dims_round_up() {
    let dem = Dem::new([0.0, -1.0], [2.5, 1.0], [1.0, 0.3], DemOptions::default()).unwrap();
    assert_eq!(dem.dims(), [3, 7]);
    assert_eq!(dem.len(), 21);
}

#[test]
fn index_of_is_half_open() {
    let dem = unit_dem(4.0, 4.0);
    assert_eq!(dem.index_of([0.0, 0.0]).unwrap(), GridIndex::new(0, 0));
    assert_eq!(dem.index_of([3.999, 2.5]).unwrap(), GridIndex::new(3, 2));
    assert!(dem.index_of([4.0, 1.0]).unwrap_err().is_out_of_bound());
    assert!(dem.index_of([-0.01, 1.0]).unwrap_err().is_out_of_bound());
    assert!(dem.index_of([1.0, f64::NAN]).unwrap_err().is_out_of_bound());
}

#[test]
fn coordinates_round_trip_within_half_cell() {
    let dem = Dem::new([-3.0, 2.0], [5.0, 9.0], [0.25, 0.4], DemOptions::default()).unwrap();
    let res = dem.resolution();
    let mut x = -2.99;
    while x < 4.99 {
        let mut y = 2.01;
        while y < 8.99 {
            let idx = dem.index_of([x, y]).unwrap();
            let c = dem.coordinates_of(idx).unwrap();
            assert!((c[0] - x).abs() <= 0.5 * res[0] + 1e-12, "x={x} c={c:?}");
            assert!((c[1] - y).abs() <= 0.5 * res[1] + 1e-12, "y={y} c={c:?}");
            y += 0.173;
        }
        x += 0.131;
    }
}

#[test]
fn accessors_are_bounds_checked() {
    let mut dem = unit_dem(2.0, 3.0);
    assert!(dem.cell(GridIndex::new(2, 0)).unwrap_err().is_out_of_bound());
    assert!(dem.cell_mut(GridIndex::new(0, 3)).unwrap_err().is_out_of_bound());
    assert!(dem.cell_at(6).unwrap_err().is_out_of_bound());
    assert!(dem.index_from_linear(6).unwrap_err().is_out_of_bound());
    assert_eq!(dem.index_from_linear(5).unwrap(), GridIndex::new(1, 2));
    assert_eq!(dem.linear(GridIndex::new(1, 2)).unwrap(), 5);
}

#[test]
#[should_panic(expected = "outside grid")]
fn index_operator_panics_out_of_range() {
    let dem = unit_dem(2.0, 2.0);
    let _ = &dem[GridIndex::new(5, 0)];
}

#[test]
fn add_point_touches_only_its_cell() {
    let mut dem = unit_dem(3.0, 3.0);
    let idx = dem.add_point(&Point::new(1.5, 2.2, 0.7)).unwrap();
    assert_eq!(idx, GridIndex::new(1, 2));
    assert!(dem[idx].is_valid());
    assert_eq!(dem.num_valid(), 1);
    assert_eq!(dem.valid_indices().collect::<Vec<_>>(), vec![7]);
    assert!(dem
        .add_point(&Point::new(3.5, 0.0, 0.0))
        .unwrap_err()
        .is_out_of_bound());
}

#[test]
fn accumulate_maps_points_and_counts_outsiders() {
    let points = vec![
        Point::new(0.5, 0.5, 0.0),
        Point::new(0.6, 0.4, 0.2),
        Point::new(9.0, 0.5, 1.0),
        Point::new(1.5, 0.5, 1.0),
    ];
    let (dem, mapping) =
        Dem::from_points(&points, [0.0, 0.0], [2.0, 1.0], [1.0, 1.0], DemOptions::default())
            .unwrap();
    assert_eq!(mapping.cells, vec![Some(0), Some(0), None, Some(1)]);
    assert_eq!(mapping.outside, 1);
    let c0 = dem.cell_at(0).unwrap();
    assert_eq!(c0.count(), 2);
    assert!((c0.mean().unwrap() - 0.1).abs() < 1e-12);
}

#[test]
fn bounds_cover_all_points() {
    let points = vec![Point::new(-1.0, 4.0, 0.0), Point::new(2.0, -3.0, 1.0)];
    let (lo, hi) = Dem::bounds_of(&points, 0.1).unwrap();
    assert_eq!(lo, [-1.0, -3.0]);
    assert!((hi[0] - 2.1).abs() < 1e-12 && (hi[1] - 4.1).abs() < 1e-12);
    assert!(Dem::bounds_of(&[], 0.1).is_none());
}
