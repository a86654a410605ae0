use super::cell::Cell;
use super::options::DemOptions;
use crate::error::{Error, Result};
use crate::types::Point;
use log::debug;
use serde::Serialize;
use std::ops::{Index, IndexMut};

/// Integer bin index `(i, j)` with `i` along x and `j` along y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GridIndex {
    pub i: usize,
    pub j: usize,
}

impl GridIndex {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

/// Point-to-cell assignment produced by [`Dem::accumulate`].
///
/// Entry `n` holds the linear cell index of point `n`, or `None` when the
/// point fell outside the grid extent.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PointMapping {
    pub cells: Vec<Option<usize>>,
    pub outside: usize,
}

impl PointMapping {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell_of(&self, point: usize) -> Option<usize> {
        self.cells.get(point).copied().flatten()
    }
}

/// Digital elevation map: a dense regular grid of [`Cell`] over a rectangle.
///
/// Cells are stored row-major with the linear index `j * nx + i`, which is
/// also the vertex id used by the graph stages.
#[derive(Clone, Debug, Serialize)]
pub struct Dem {
    minimum: [f64; 2],
    maximum: [f64; 2],
    resolution: [f64; 2],
    dims: [usize; 2],
    cells: Vec<Cell>,
    options: DemOptions,
}

impl Dem {
    pub fn new(
        minimum: [f64; 2],
        maximum: [f64; 2],
        resolution: [f64; 2],
        options: DemOptions,
    ) -> Result<Self> {
        for d in 0..2 {
            if !resolution[d].is_finite() || resolution[d] <= 0.0 {
                return Err(Error::bad_argument(format!(
                    "resolution[{d}] must be positive, got {}",
                    resolution[d]
                )));
            }
            if !minimum[d].is_finite() || !maximum[d].is_finite() || minimum[d] >= maximum[d] {
                return Err(Error::bad_argument(format!(
                    "minimum[{d}]={} must be below maximum[{d}]={}",
                    minimum[d], maximum[d]
                )));
            }
        }
        options.validate()?;
        let dims = [
            ((maximum[0] - minimum[0]) / resolution[0]).ceil() as usize,
            ((maximum[1] - minimum[1]) / resolution[1]).ceil() as usize,
        ];
        let len = dims[0]
            .checked_mul(dims[1])
            .ok_or_else(|| Error::bad_argument("grid dimensions overflow"))?;
        let cells = (0..len)
            .map(|_| Cell::new(options.min_points, options.histogram_bin_width))
            .collect();
        Ok(Self {
            minimum,
            maximum,
            resolution,
            dims,
            cells,
            options,
        })
    }

    /// Builds a grid over `[minimum, maximum)` and bins every point into it.
    pub fn from_points(
        points: &[Point],
        minimum: [f64; 2],
        maximum: [f64; 2],
        resolution: [f64; 2],
        options: DemOptions,
    ) -> Result<(Self, PointMapping)> {
        let mut dem = Self::new(minimum, maximum, resolution, options)?;
        let mapping = dem.accumulate(points);
        Ok((dem, mapping))
    }

    /// Tight XY bound of a cloud, widened by `margin` on the upper side so the
    /// extreme points fall strictly inside the half-open extent.
    pub fn bounds_of(points: &[Point], margin: f64) -> Option<([f64; 2], [f64; 2])> {
        let first = points.first()?;
        let mut lo = [first.x, first.y];
        let mut hi = lo;
        for p in points {
            lo[0] = lo[0].min(p.x);
            lo[1] = lo[1].min(p.y);
            hi[0] = hi[0].max(p.x);
            hi[1] = hi[1].max(p.y);
        }
        let margin = margin.max(f64::EPSILON);
        Some((lo, [hi[0] + margin, hi[1] + margin]))
    }

    pub fn minimum(&self) -> [f64; 2] {
        self.minimum
    }

    pub fn maximum(&self) -> [f64; 2] {
        self.maximum
    }

    pub fn resolution(&self) -> [f64; 2] {
        self.resolution
    }

    /// Number of bins along x and y.
    pub fn dims(&self) -> [usize; 2] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn options(&self) -> &DemOptions {
        &self.options
    }

    /// Bin containing `coord`; fails outside `[minimum, maximum)`.
    pub fn index_of(&self, coord: [f64; 2]) -> Result<GridIndex> {
        let mut idx = [0usize; 2];
        for d in 0..2 {
            let c = coord[d];
            if !c.is_finite() || c < self.minimum[d] || c >= self.maximum[d] {
                return Err(Error::out_of_bound(format!(
                    "coordinate {c} outside [{}, {}) on axis {d}",
                    self.minimum[d], self.maximum[d]
                )));
            }
            let bin = ((c - self.minimum[d]) / self.resolution[d]).floor() as usize;
            idx[d] = bin.min(self.dims[d] - 1);
        }
        Ok(GridIndex::new(idx[0], idx[1]))
    }

    /// Centre of the bin at `index`.
    pub fn coordinates_of(&self, index: GridIndex) -> Result<[f64; 2]> {
        self.check(index)?;
        Ok(self.centre_unchecked(index))
    }

    pub fn linear(&self, index: GridIndex) -> Result<usize> {
        self.check(index)?;
        Ok(index.j * self.dims[0] + index.i)
    }

    pub fn index_from_linear(&self, linear: usize) -> Result<GridIndex> {
        if linear >= self.cells.len() {
            return Err(Error::out_of_bound(format!(
                "linear index {linear} outside grid of {} cells",
                self.cells.len()
            )));
        }
        Ok(GridIndex::new(linear % self.dims[0], linear / self.dims[0]))
    }

    pub fn cell(&self, index: GridIndex) -> Result<&Cell> {
        let lin = self.linear(index)?;
        Ok(&self.cells[lin])
    }

    pub fn cell_mut(&mut self, index: GridIndex) -> Result<&mut Cell> {
        let lin = self.linear(index)?;
        Ok(&mut self.cells[lin])
    }

    /// Cell by linear index (the graph vertex id).
    pub fn cell_at(&self, linear: usize) -> Result<&Cell> {
        self.cells.get(linear).ok_or_else(|| {
            Error::out_of_bound(format!(
                "vertex {linear} outside grid of {} cells",
                self.cells.len()
            ))
        })
    }

    pub fn cell_at_mut(&mut self, linear: usize) -> Result<&mut Cell> {
        let len = self.cells.len();
        self.cells.get_mut(linear).ok_or_else(|| {
            Error::out_of_bound(format!("vertex {linear} outside grid of {len} cells"))
        })
    }

    /// Centre of the cell with linear index `linear`.
    pub fn centre_at(&self, linear: usize) -> Result<[f64; 2]> {
        let index = self.index_from_linear(linear)?;
        Ok(self.centre_unchecked(index))
    }

    /// Bins one point and returns the cell it landed in.
    pub fn add_point(&mut self, point: &Point) -> Result<GridIndex> {
        let index = self.index_of([point.x, point.y])?;
        let lin = index.j * self.dims[0] + index.i;
        self.cells[lin].add_point(point.z);
        Ok(index)
    }

    /// Bins a whole cloud. Points outside the extent are skipped and counted.
    pub fn accumulate(&mut self, points: &[Point]) -> PointMapping {
        let mut mapping = PointMapping {
            cells: Vec::with_capacity(points.len()),
            outside: 0,
        };
        for p in points {
            match self.add_point(p) {
                Ok(index) => mapping.cells.push(Some(index.j * self.dims[0] + index.i)),
                Err(_) => {
                    mapping.cells.push(None);
                    mapping.outside += 1;
                }
            }
        }
        if mapping.outside > 0 {
            debug!(
                "DEM: {} of {} points outside [{:?}, {:?})",
                mapping.outside,
                points.len(),
                self.minimum,
                self.maximum
            );
        }
        mapping
    }

    /// Linear indices of all valid cells in ascending order.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_valid())
            .map(|(i, _)| i)
    }

    pub fn num_valid(&self) -> usize {
        self.cells.iter().filter(|c| c.is_valid()).count()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn clear_annotations(&mut self) {
        for cell in &mut self.cells {
            cell.clear_annotations();
        }
    }

    fn check(&self, index: GridIndex) -> Result<()> {
        if index.i >= self.dims[0] || index.j >= self.dims[1] {
            return Err(Error::out_of_bound(format!(
                "index ({}, {}) outside grid {}x{}",
                index.i, index.j, self.dims[0], self.dims[1]
            )));
        }
        Ok(())
    }

    fn centre_unchecked(&self, index: GridIndex) -> [f64; 2] {
        [
            self.minimum[0] + (index.i as f64 + 0.5) * self.resolution[0],
            self.minimum[1] + (index.j as f64 + 0.5) * self.resolution[1],
        ]
    }
}

impl Index<GridIndex> for Dem {
    type Output = Cell;

    fn index(&self, index: GridIndex) -> &Cell {
        assert!(
            index.i < self.dims[0] && index.j < self.dims[1],
            "index ({}, {}) outside grid {}x{}",
            index.i,
            index.j,
            self.dims[0],
            self.dims[1]
        );
        &self.cells[index.j * self.dims[0] + index.i]
    }
}

impl IndexMut<GridIndex> for Dem {
    fn index_mut(&mut self, index: GridIndex) -> &mut Cell {
        assert!(
            index.i < self.dims[0] && index.j < self.dims[1],
            "index ({}, {}) outside grid {}x{}",
            index.i,
            index.j,
            self.dims[0],
            self.dims[1]
        );
        let nx = self.dims[0];
        &mut self.cells[index.j * nx + index.i]
    }
}
