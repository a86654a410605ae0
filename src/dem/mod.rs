//! Digital elevation map built from a LIDAR point cloud.
//!
//! The [`Dem`] bins points over a bounded XY rectangle into a dense grid of
//! [`Cell`]s, each accumulating the heights that fall inside its footprint.
//! Coordinate↔index mapping is affine: `i = floor((x - min_x) / res_x)` and the
//! inverse returns the bin centre, so interior coordinates round-trip to within
//! half a cell.
//!
//! Modules
//! - `cell` – Welford mean/variance accumulator plus median histogram.
//! - `grid` – the grid itself, bounds-checked accessors and bulk binning.
//! - `histogram` – sparse fixed-width height histogram.
//! - `options` – accumulation parameters.

mod cell;
mod grid;
mod histogram;
mod options;

pub use cell::Cell;
pub use grid::{Dem, GridIndex, PointMapping};
pub use histogram::HeightHistogram;
pub use options::DemOptions;

#[cfg(test)]
mod tests;
