#![allow(dead_code)]

use curb_detector::Point;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 4×4 unit cells, one point per cell centre: columns 0..1 at height 0,
/// columns 2..3 at height 1.
pub fn step_cloud() -> Vec<Point> {
    let mut points = Vec::with_capacity(16);
    for j in 0..4 {
        for i in 0..4 {
            let h = if i < 2 { 0.0 } else { 1.0 };
            points.push(Point::new(i as f64 + 0.5, j as f64 + 0.5, h));
        }
    }
    points
}

pub const CURB_CELL: f64 = 0.25;
pub const CURB_NX: usize = 16;
pub const CURB_NY: usize = 12;
pub const CURB_HEIGHT: f64 = 0.15;
pub const CURB_SLOPE: f64 = 0.02;

/// Road (`i < CURB_NX / 2`) and sidewalk raised by `CURB_HEIGHT`, both
/// rising by `CURB_SLOPE` along y, four points per `CURB_CELL` cell over
/// `[0, 4) × [0, 3)`.
pub fn curb_cloud() -> Vec<Point> {
    const OFFSETS: [f64; 2] = [0.0625, 0.1875];
    let mut points = Vec::with_capacity(CURB_NX * CURB_NY * 4);
    for j in 0..CURB_NY {
        for i in 0..CURB_NX {
            let base = if is_sidewalk(i) { CURB_HEIGHT } else { 0.0 };
            for dy in OFFSETS {
                for dx in OFFSETS {
                    let x = i as f64 * CURB_CELL + dx;
                    let y = j as f64 * CURB_CELL + dy;
                    points.push(Point::new(x, y, base + CURB_SLOPE * y));
                }
            }
        }
    }
    points
}

pub fn is_sidewalk(i: usize) -> bool {
    i >= CURB_NX / 2
}
