use super::histogram::HeightHistogram;
use serde::Serialize;

/// Per-bin accumulator of height samples.
///
/// Mean and variance are maintained with Welford's online update; the sparse
/// histogram backs median-based statistics. After segmentation and fitting the
/// pipeline may annotate the cell with a label and mixture responsibilities.
#[derive(Clone, Debug, Serialize)]
pub struct Cell {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    valid: bool,
    min_points: usize,
    #[serde(skip)]
    histogram: HeightHistogram,
    pub label: Option<usize>,
    pub responsibilities: Option<Vec<f64>>,
}

impl Cell {
    pub fn new(min_points: usize, histogram_bin_width: f64) -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            valid: false,
            min_points: min_points.max(1),
            histogram: HeightHistogram::new(histogram_bin_width),
            label: None,
            responsibilities: None,
        }
    }

    pub fn add_point(&mut self, height: f64) {
        self.count += 1;
        let delta = height - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (height - self.mean);
        self.min = self.min.min(height);
        self.max = self.max.max(height);
        self.histogram.accumulate(height);
        self.valid = self.count >= self.min_points;
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Running mean height, `None` for an empty cell.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population variance of the accumulated heights.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.m2 / self.count as f64).max(0.0))
    }

    /// Unbiased sample variance; needs at least two samples.
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).max(0.0))
    }

    pub fn median(&self) -> Option<f64> {
        self.histogram.median()
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn histogram(&self) -> &HeightHistogram {
        &self.histogram
    }

    /// Drops labels and responsibilities while keeping accumulated samples.
    pub fn clear_annotations(&mut self) {
        self.label = None;
        self.responsibilities = None;
    }
}
