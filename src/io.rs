//! File helpers for the demo tooling.
//!
//! - `load_points_xyz`: read an `x y z` text cloud (whitespace or commas).
//! - `save_height_map_png`: mean cell height as an 8-bit grayscale PNG.
//! - `save_label_map_png`: final cell labels as an 8-bit grayscale PNG.
//! - `write_json_file`: pretty-print a serializable value to disk.
use crate::dem::Dem;
use crate::error::{Error, Result};
use crate::types::Point;
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load a point cloud with one `x y z` triple per line.
///
/// Blank lines and lines starting with `#` are skipped; extra columns
/// (intensity, ring, ...) are ignored.
pub fn load_points_xyz(path: &Path) -> Result<Vec<Point>> {
    let contents = fs::read_to_string(path)?;
    parse_points_xyz(&contents)
        .map_err(|e| Error::bad_argument(format!("{}: {e}", path.display())))
}

fn parse_points_xyz(contents: &str) -> std::result::Result<Vec<Point>, String> {
    let mut points = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty());
        let mut xyz = [0.0f64; 3];
        for value in xyz.iter_mut() {
            let field = fields
                .next()
                .ok_or_else(|| format!("line {}: expected 3 coordinates", lineno + 1))?;
            *value = field
                .parse()
                .map_err(|e| format!("line {}: invalid number {field:?}: {e}", lineno + 1))?;
        }
        points.push(Point::new(xyz[0], xyz[1], xyz[2]));
    }
    Ok(points)
}

/// Save the mean height of every valid cell, stretched to [1, 255].
///
/// Invalid cells are black. Row 0 of the image is the top (largest y) row.
pub fn save_height_map_png(dem: &Dem, path: &Path) -> Result<()> {
    let means: Vec<Option<f64>> = dem.cells().iter().map(|c| c.mean()).collect();
    let (lo, hi) = means
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &m| {
            (lo.min(m), hi.max(m))
        });
    let span = if hi > lo { hi - lo } else { 1.0 };
    save_cell_image(dem, path, |linear| {
        means[linear].map_or(0, |m| (1.0 + 254.0 * (m - lo) / span).round() as u8)
    })
}

/// Save the final label of every cell as an evenly spaced gray level.
///
/// Unlabeled cells are black.
pub fn save_label_map_png(dem: &Dem, path: &Path) -> Result<()> {
    let cells = dem.cells();
    let levels = cells.iter().filter_map(|c| c.label).max().map_or(1, |m| m + 1);
    save_cell_image(dem, path, |linear| {
        cells[linear]
            .label
            .map_or(0, |l| (255 * (l + 1) / levels).min(255) as u8)
    })
}

fn save_cell_image(dem: &Dem, path: &Path, value: impl Fn(usize) -> u8) -> Result<()> {
    ensure_parent_dir(path)?;
    let [nx, ny] = dem.dims();
    let mut out = GrayImage::new(nx as u32, ny as u32);
    for j in 0..ny {
        for i in 0..nx {
            let row = (ny - 1 - j) as u32;
            out.put_pixel(i as u32, row, Luma([value(j * nx + i)]));
        }
    }
    out.save(path)?;
    Ok(())
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
