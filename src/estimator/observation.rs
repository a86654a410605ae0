use crate::dem::{Dem, PointMapping};
use crate::error::{Error, Result};
use crate::segment::Segmentation;
use crate::types::{Point, VertexId};
use serde::Serialize;

/// One height sample seen by the estimators.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Observation {
    pub position: [f64; 2],
    pub z: f64,
    /// DEM cell the sample was binned into.
    pub cell: Option<VertexId>,
    /// Segmentation region of that cell.
    pub region: Option<usize>,
}

impl Observation {
    pub fn new(position: [f64; 2], z: f64) -> Self {
        Self {
            position,
            z,
            cell: None,
            region: None,
        }
    }

    pub fn with_region(mut self, region: usize) -> Self {
        self.region = Some(region);
        self
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.position[0].is_finite() && self.position[1].is_finite() && self.z.is_finite()
    }
}

/// Joins raw points with their DEM cell and segmentation region.
///
/// Points outside the grid (no cell in `mapping`) are dropped. Points in a
/// cell the segmentation never saw keep `region == None`.
pub fn observations_from_points(
    points: &[Point],
    mapping: &PointMapping,
    dem: &Dem,
    segmentation: &Segmentation,
) -> Result<Vec<Observation>> {
    if mapping.len() != points.len() {
        return Err(Error::bad_argument(format!(
            "point mapping has {} entries for {} points",
            mapping.len(),
            points.len()
        )));
    }
    let mut out = Vec::with_capacity(points.len());
    for (n, p) in points.iter().enumerate() {
        let Some(cell) = mapping.cell_of(n) else {
            continue;
        };
        if cell >= dem.len() {
            return Err(Error::out_of_bound(format!(
                "point {n} mapped to cell {cell} of {}",
                dem.len()
            )));
        }
        out.push(Observation {
            position: [p.x, p.y],
            z: p.z,
            cell: Some(cell),
            region: segmentation.component_of(cell),
        });
    }
    Ok(out)
}

/// One observation per valid cell: the cell centre with its mean height.
pub fn observations_from_cells(dem: &Dem, segmentation: &Segmentation) -> Vec<Observation> {
    dem.valid_indices()
        .filter_map(|v| {
            let position = dem.centre_at(v).ok()?;
            let z = dem.cell_at(v).ok()?.mean()?;
            Some(Observation {
                position,
                z,
                cell: Some(v),
                region: segmentation.component_of(v),
            })
        })
        .collect()
}

/// Number of pairwise distinct `(x, y, z)` samples.
pub(crate) fn count_distinct(data: &[Observation]) -> usize {
    let mut keys: Vec<[u64; 3]> = data
        .iter()
        .map(|o| {
            [
                o.position[0].to_bits(),
                o.position[1].to_bits(),
                o.z.to_bits(),
            ]
        })
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}
