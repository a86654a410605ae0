use serde::Serialize;
use std::collections::BTreeMap;

/// Sparse fixed-width histogram of height samples used for median statistics.
///
/// Bins are keyed by `floor(h / bin_width)` so the range is unbounded and only
/// occupied bins cost memory.
#[derive(Clone, Debug, Serialize)]
pub struct HeightHistogram {
    bin_width: f64,
    bins: BTreeMap<i64, u32>,
    total: u64,
}

impl HeightHistogram {
    pub fn new(bin_width: f64) -> Self {
        debug_assert!(
            bin_width.is_finite() && bin_width > 0.0,
            "height histogram requires a positive bin width"
        );
        Self {
            bin_width,
            bins: BTreeMap::new(),
            total: 0,
        }
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn accumulate(&mut self, height: f64) {
        if !height.is_finite() {
            return;
        }
        let key = (height / self.bin_width).floor() as i64;
        *self.bins.entry(key).or_insert(0) += 1;
        self.total += 1;
    }

    /// Centre of the bin holding the median sample, `None` when empty.
    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }

    /// Centre of the bin in which the cumulative mass first reaches `q`.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let q = q.clamp(0.0, 1.0);
        let target = ((self.total as f64) * q).ceil().max(1.0) as u64;
        let mut cumulative = 0u64;
        for (&key, &count) in &self.bins {
            cumulative += count as u64;
            if cumulative >= target {
                return Some(self.bin_centre(key));
            }
        }
        self.bins.keys().next_back().map(|&k| self.bin_centre(k))
    }

    /// Centre of the most populated bin (lowest bin wins ties).
    pub fn mode(&self) -> Option<f64> {
        let mut best: Option<(i64, u32)> = None;
        for (&key, &count) in &self.bins {
            match best {
                Some((_, c)) if c >= count => {}
                _ => best = Some((key, count)),
            }
        }
        best.map(|(k, _)| self.bin_centre(k))
    }

    fn bin_centre(&self, key: i64) -> f64 {
        (key as f64 + 0.5) * self.bin_width
    }
}
