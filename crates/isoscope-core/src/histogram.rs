//! Scalar and gradient histograms, the joint heatmap, and histogram equalization.
//!
//! Bucket assignment scans the half-open bins `[low, high)` in ascending order
//! and takes the first match. Bin widths are `(max + 1) / interval`, so the
//! global maximum always lands in the last bucket.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use serde::{Deserialize, Serialize};

use crate::error::{IsoError, Result};
use crate::volume::{max_of, RawVolume};

/// Number of grey levels an 8-bit volume can take.
pub const LEVELS: usize = 256;

/// A half-open histogram bin `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub low: f32,
    pub high: f32,
}

impl Bin {
    /// Whether `value` falls inside `[low, high)`.
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        self.low <= value && value < self.high
    }
}

/// Which axis of the heatmap a set of labels is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatmapAxis {
    /// Horizontal axis: iso-values.
    IsoValue,
    /// Vertical axis: gradient magnitudes.
    Gradient,
}

/// A 1D histogram over `[0, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    counts: Vec<u64>,
    boundaries: Vec<Bin>,
}

impl Histogram {
    /// Builds a histogram of `values` with `interval` equal-width buckets.
    pub fn build(values: &[f32], interval: u32) -> Result<Self> {
        let boundaries = boundaries_for(values, interval)?;
        let mut counts = vec![0u64; boundaries.len()];
        for &value in values {
            if let Some(bucket) = first_match(&boundaries, value) {
                counts[bucket] += 1;
            }
        }
        Ok(Self { counts, boundaries })
    }

    /// Histogram of the scalar values of a volume.
    pub fn of_volume(volume: &RawVolume, interval: u32) -> Result<Self> {
        Self::build(volume.samples(), interval)
    }

    /// Bucket populations.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Bucket boundaries in ascending order.
    #[must_use]
    pub fn boundaries(&self) -> &[Bin] {
        &self.boundaries
    }

    /// Number of buckets.
    #[must_use]
    pub fn interval(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all bucket populations.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Populations as floats, for plotting.
    #[must_use]
    pub fn counts_f32(&self) -> Vec<f32> {
        self.counts.iter().map(|&c| c as f32).collect()
    }

    /// First bucket containing `value`, if any.
    #[must_use]
    pub fn bucket_of(&self, value: f32) -> Option<usize> {
        first_match(&self.boundaries, value)
    }

    /// Like [`Histogram::bucket_of`], but values matching no bucket fall
    /// through to the last bucket scanned.
    #[must_use]
    pub fn bucket_or_last(&self, value: f32) -> usize {
        self.bucket_of(value)
            .unwrap_or_else(|| self.boundaries.len().saturating_sub(1))
    }

    /// Five evenly spaced axis labels: the lower bound of the buckets starting
    /// each quarter, then the upper bound of the last bucket.
    #[must_use]
    pub fn axis_labels(&self) -> Option<[String; 5]> {
        if self.boundaries.is_empty() {
            return None;
        }
        let step = self.boundaries.len() as f32 / 4.0;
        let low = |i: usize| {
            let bucket = (step * i as f32) as usize;
            (self.boundaries[bucket].low as i32).to_string()
        };
        let last = (step * 4.0) as usize - 1;
        Some([
            low(0),
            low(1),
            low(2),
            low(3),
            (self.boundaries[last].high as i32).to_string(),
        ])
    }
}

/// Joint distribution of iso-value and gradient magnitude.
///
/// Stored row-major, `interval x interval`. Row `interval - 1 - g` holds
/// gradient bucket `g`, so the highest gradients are in the first row; the
/// column is the iso-value bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    interval: usize,
    cells: Vec<u64>,
}

impl Heatmap {
    /// Counts every voxel into its (gradient, iso-value) cell.
    ///
    /// A value that matches no bucket is attributed to the last bucket.
    pub fn build(
        samples: &[f32],
        magnitudes: &[f32],
        iso_histogram: &Histogram,
        gradient_histogram: &Histogram,
    ) -> Result<Self> {
        if samples.len() != magnitudes.len() {
            return Err(IsoError::SizeMismatch {
                expected: samples.len(),
                actual: magnitudes.len(),
            });
        }
        let interval = iso_histogram.interval();
        if gradient_histogram.interval() != interval {
            return Err(IsoError::SizeMismatch {
                expected: interval,
                actual: gradient_histogram.interval(),
            });
        }
        if interval == 0 {
            return Err(IsoError::InvalidInterval(0));
        }

        let mut cells = vec![0u64; interval * interval];
        for (&value, &magnitude) in samples.iter().zip(magnitudes) {
            let gradient_bucket = gradient_histogram.bucket_or_last(magnitude);
            let iso_bucket = iso_histogram.bucket_or_last(value);
            cells[(interval - 1 - gradient_bucket) * interval + iso_bucket] += 1;
        }
        Ok(Self { interval, cells })
    }

    /// Buckets per axis.
    #[must_use]
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// All cells, row-major.
    #[must_use]
    pub fn cells(&self) -> &[u64] {
        &self.cells
    }

    /// Cells as floats, for plotting.
    #[must_use]
    pub fn cells_f32(&self) -> Vec<f32> {
        self.cells.iter().map(|&c| c as f32).collect()
    }

    /// Population of a single cell.
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> u64 {
        self.cells[row * self.interval + column]
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }
}

/// Result of equalizing a histogram of grey levels.
#[derive(Debug, Clone, PartialEq)]
pub struct Equalization {
    histogram: Vec<u64>,
    remap: Vec<u8>,
}

impl Equalization {
    /// Computes the equalization of per-level `counts`.
    ///
    /// Level `i` maps to `round(cdf(i) * 255)`. The returned histogram has
    /// [`LEVELS`] buckets holding the relabelled populations.
    #[must_use]
    pub fn from_counts(counts: &[u64]) -> Self {
        let total: u64 = counts.iter().sum();
        let mut histogram = vec![0u64; LEVELS];
        let mut remap = Vec::with_capacity(counts.len());

        let mut cumulative = 0.0f32;
        for &count in counts {
            if total > 0 {
                cumulative += count as f32 / total as f32;
            }
            let level = (cumulative * 255.0).round().clamp(0.0, 255.0) as u8;
            histogram[usize::from(level)] += count;
            remap.push(level);
        }

        Self { histogram, remap }
    }

    /// Equalizes the grey levels of a volume. See [`level_counts`].
    pub fn of_volume(volume: &RawVolume) -> Result<Self> {
        Ok(Self::from_counts(&level_counts(volume.samples())?))
    }

    /// Relabelled histogram.
    #[must_use]
    pub fn histogram(&self) -> &[u64] {
        &self.histogram
    }

    /// New level for each original level.
    #[must_use]
    pub fn remap(&self) -> &[u8] {
        &self.remap
    }

    /// Rewrites every sample `s` to `remap[s]`.
    ///
    /// All samples are checked before any is changed, so on error the volume
    /// is left untouched.
    pub fn apply(&self, volume: &mut RawVolume) -> Result<()> {
        for (index, &value) in volume.samples().iter().enumerate() {
            if level_of(value).map_or(true, |level| level >= self.remap.len()) {
                return Err(IsoError::EqualizationOutOfRange { index, value });
            }
        }
        for sample in volume.samples_mut() {
            if let Some(level) = level_of(*sample) {
                *sample = f32::from(self.remap[level]);
            }
        }
        Ok(())
    }
}

/// Counts samples per integer grey level `0..=255`.
///
/// Fails on any sample outside `[0, 255]`; fractional samples are truncated.
pub fn level_counts(samples: &[f32]) -> Result<Vec<u64>> {
    let mut counts = vec![0u64; LEVELS];
    for (index, &value) in samples.iter().enumerate() {
        let level = level_of(value)
            .filter(|&level| level < LEVELS)
            .ok_or(IsoError::EqualizationOutOfRange { index, value })?;
        counts[level] += 1;
    }
    Ok(counts)
}

fn level_of(value: f32) -> Option<usize> {
    if value.is_finite() && value >= 0.0 {
        Some(value as usize)
    } else {
        None
    }
}

fn boundaries_for(values: &[f32], interval: u32) -> Result<Vec<Bin>> {
    if interval == 0 {
        return Err(IsoError::InvalidInterval(interval));
    }
    let max = if values.is_empty() { 0.0 } else { max_of(values) };
    let width = (max + 1.0) / interval as f32;
    Ok((0..interval)
        .map(|i| Bin {
            low: width * i as f32,
            high: width * (i + 1) as f32,
        })
        .collect())
}

fn first_match(boundaries: &[Bin], value: f32) -> Option<usize> {
    boundaries.iter().position(|bin| bin.contains(value))
}
