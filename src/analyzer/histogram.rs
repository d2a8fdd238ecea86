//! Width histograms over relative-tolerance equivalence classes.
//!
//! Pulse, gap and period widths cluster around a handful of nominal values
//! with jitter proportional to the width, so bins are formed by a relative
//! predicate: a sample joins a bin when it sits within `tolerance` of the bin
//! mean, scaled by the larger of the two. Binning is a single linear probe per
//! sample; a fuse pass afterwards merges bins whose means drifted together.

use std::fmt::Write as _;

/// Maximum number of bins per histogram.
pub const MAX_BINS: usize = 16;

/// One equivalence class of widths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bin {
    pub count: u32,
    pub sum: i32,
    pub mean: i32,
    pub min: i32,
    pub max: i32,
}

impl Bin {
    fn seed(value: i32) -> Self {
        Self {
            count: 1,
            sum: value,
            mean: value,
            min: value,
            max: value,
        }
    }

    fn absorb_value(&mut self, value: i32) {
        self.count += 1;
        self.sum += value;
        self.mean = self.sum / self.count as i32;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn absorb_bin(&mut self, other: &Bin) {
        self.count += other.count;
        self.sum += other.sum;
        self.mean = self.sum / self.count as i32;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Two widths match when they differ by less than `tolerance` of the larger.
fn within_tolerance(a: i32, b: i32, tolerance: f32) -> bool {
    ((a - b).abs() as f32) < tolerance * a.max(b) as f32
}

/// Histogram of widths, at most [`MAX_BINS`] bins.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    bins: Vec<Bin>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Bin each sample into the first matching bin, opening a new one when
    /// nothing matches and capacity remains. Samples that match no bin at
    /// capacity are dropped.
    pub fn add_samples(&mut self, data: &[i32], tolerance: f32) {
        for &value in data {
            let idx = self
                .bins
                .iter()
                .position(|bin| within_tolerance(value, bin.mean, tolerance));
            match idx {
                Some(i) => self.bins[i].absorb_value(value),
                None if self.bins.len() < MAX_BINS => self.bins.push(Bin::seed(value)),
                None => {}
            }
        }
    }

    /// Merge bins whose means fall within tolerance of each other, repeating
    /// until no pair matches. Fusing shifts means, so a single pass is not
    /// enough to guarantee all-pairs separation.
    pub fn fuse_bins(&mut self, tolerance: f32) {
        loop {
            let mut fused = false;
            let mut n = 0;
            while n < self.bins.len() {
                let mut m = n + 1;
                while m < self.bins.len() {
                    if within_tolerance(self.bins[n].mean, self.bins[m].mean, tolerance) {
                        let other = self.bins.remove(m);
                        self.bins[n].absorb_bin(&other);
                        fused = true;
                        // Re-check the same index against the updated mean.
                    } else {
                        m += 1;
                    }
                }
                n += 1;
            }
            if !fused {
                return;
            }
        }
    }

    /// Order bins lowest mean first.
    pub fn sort_by_mean(&mut self) {
        self.bins.sort_by_key(|bin| bin.mean);
    }

    /// Order bins lowest count first.
    pub fn sort_by_count(&mut self) {
        self.bins.sort_by_key(|bin| bin.count);
    }

    /// Drop the bin at `index`; out-of-range indexes are ignored.
    pub fn remove_bin(&mut self, index: usize) {
        if index < self.bins.len() {
            self.bins.remove(index);
        }
    }

    /// One line per bin: count, mean width with [min;max] spread, and the mean
    /// converted to microseconds at the given sample rate.
    pub fn describe(&self, sample_rate: u32) -> String {
        let mut out = String::new();
        for (n, bin) in self.bins.iter().enumerate() {
            let _ = writeln!(
                out,
                " [{:2}] count: {:4},  width: {:5} [{:2};{:2}]\t({:4.0} us)",
                n,
                bin.count,
                bin.mean,
                bin.min,
                bin.max,
                1e6 * bin.mean as f32 / sample_rate as f32
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 0.2;

    #[test]
    fn close_samples_share_a_bin() {
        let mut hist = Histogram::new();
        hist.add_samples(&[100, 95, 105, 98], TOLERANCE);
        assert_eq!(hist.len(), 1);
        let bin = hist.bins()[0];
        assert_eq!(bin.count, 4);
        assert_eq!(bin.min, 95);
        assert_eq!(bin.max, 105);
        assert_eq!(bin.mean, (100 + 95 + 105 + 98) / 4);
    }

    #[test]
    fn distant_samples_open_new_bins() {
        let mut hist = Histogram::new();
        hist.add_samples(&[100, 200, 400], TOLERANCE);
        assert_eq!(hist.len(), 3);
    }

    #[test]
    fn capacity_is_bounded() {
        let mut hist = Histogram::new();
        // Widely spaced values: every one wants its own bin.
        let data: Vec<i32> = (0..32).map(|n| 100 << n.min(20)).collect();
        hist.add_samples(&data, TOLERANCE);
        assert!(hist.len() <= MAX_BINS);
    }

    #[test]
    fn fuse_leaves_all_pairs_separated() {
        let mut hist = Histogram::new();
        // A ramp of values whose neighboring bins end up within tolerance of
        // each other once means shift during binning.
        let data: Vec<i32> = (0..200).map(|n| 100 + n * 3).collect();
        hist.add_samples(&data, TOLERANCE);
        hist.fuse_bins(TOLERANCE);

        for (i, a) in hist.bins().iter().enumerate() {
            for b in &hist.bins()[i + 1..] {
                assert!(
                    !within_tolerance(a.mean, b.mean, TOLERANCE),
                    "bins {} and {} remain within tolerance",
                    a.mean,
                    b.mean
                );
            }
        }
    }

    #[test]
    fn fuse_accumulates_counts() {
        let mut hist = Histogram::new();
        // 150 seeds its own bin next to 200, then a run of 170s drags the
        // first bin's mean down until the two fall within tolerance.
        hist.add_samples(&[200, 150, 170, 170, 170, 170, 170, 170, 170, 170], TOLERANCE);
        assert_eq!(hist.len(), 2);
        hist.fuse_bins(TOLERANCE);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.bins()[0].count, 10);
        assert_eq!(hist.bins()[0].mean, 171);
        assert_eq!(hist.bins()[0].min, 150);
        assert_eq!(hist.bins()[0].max, 200);
    }

    #[test]
    fn sorts_by_mean_and_count() {
        let mut hist = Histogram::new();
        hist.add_samples(&[500, 500, 500, 100, 250, 250], TOLERANCE);
        hist.sort_by_mean();
        let means: Vec<i32> = hist.bins().iter().map(|b| b.mean).collect();
        assert_eq!(means, vec![100, 250, 500]);

        hist.sort_by_count();
        let counts: Vec<u32> = hist.bins().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[test]
    fn describe_converts_to_microseconds() {
        let mut hist = Histogram::new();
        hist.add_samples(&[250], TOLERANCE);
        let text = hist.describe(250_000);
        assert!(text.contains("count:    1"), "got: {}", text);
        assert!(text.contains("1000 us"), "got: {}", text);
    }
}
