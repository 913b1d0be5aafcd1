// src/density.rs - Path length density as an equal-width histogram on [0, 1]
//
// Bin values are densities, not counts: they always sum to the bin count.

use std::fmt;

use serde::Serialize;

use crate::errors::{LaiPathError, Result};

/// Number of bins used when building a density from raw path lengths
pub const DEFAULT_BIN_COUNT: usize = 25;

/// Nudge applied to the last upper edge so the normalized maximum (exactly 1.0)
/// lands inside the final bin
pub const UPPER_EDGE_EPSILON: f64 = 1e-6;

/// Normalized histogram of path lengths
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Density {
    edges: Vec<f64>,
    bins: Vec<f64>,
}

/// One printable row of a density table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramRow {
    pub lower: f64,
    pub upper: f64,
    pub density: f64,
}

/// Build a density from raw path length samples.
///
/// Samples are divided by their maximum, counted into `bin_count` bins and
/// rescaled so the bins sum to `bin_count`.
pub fn build_density(samples: &[f64], bin_count: usize) -> Result<Density> {
    Density::from_samples(samples, bin_count)
}

impl Density {
    /// See [`build_density`]
    pub fn from_samples(samples: &[f64], bin_count: usize) -> Result<Self> {
        if bin_count == 0 {
            return Err(LaiPathError::invalid("bin count must be > 0"));
        }
        if samples.is_empty() {
            return Err(LaiPathError::invalid("no path length samples"));
        }
        if let Some(bad) = samples.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(LaiPathError::invalid(format!(
                "path length {} is negative or not finite",
                bad
            )));
        }

        let max = samples.iter().cloned().fold(f64::MIN, f64::max);
        let min = samples.iter().cloned().fold(f64::MAX, f64::min);
        if max <= min {
            return Err(LaiPathError::invalid(format!(
                "all {} path lengths are identical ({}), the normalized range is empty",
                samples.len(),
                max
            )));
        }

        let mut edges = uniform_edges(bin_count);
        edges[bin_count] = 1.0 + UPPER_EDGE_EPSILON;

        let mut bins = vec![0.0; bin_count];
        let mut inserted = 0usize;
        for sample in samples {
            let normalized = sample / max;
            if let Some(index) = find_bin(&edges, normalized) {
                bins[index] += 1.0;
                inserted += 1;
            }
        }

        // Every normalized sample lies in [0, 1], so nothing is dropped here.
        let scale = bin_count as f64 / inserted as f64;
        bins.iter_mut().for_each(|b| *b *= scale);

        log::debug!(
            "Built density from {} path lengths into {} bins (max path length {:.4})",
            inserted,
            bin_count,
            max
        );

        Ok(Self { edges, bins })
    }

    /// Density from relative bin frequencies over `[0, 1]`.
    ///
    /// Only the proportions matter: `{100, 200, 300}` and `{0.1, 0.2, 0.3}`
    /// produce the same density.
    pub fn from_frequencies(frequencies: &[f64]) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(LaiPathError::invalid("no bin frequencies"));
        }
        if let Some(bad) = frequencies.iter().find(|f| !f.is_finite() || **f < 0.0) {
            return Err(LaiPathError::invalid(format!(
                "bin frequency {} is negative or not finite",
                bad
            )));
        }
        let sum: f64 = frequencies.iter().sum();
        if sum <= 0.0 {
            return Err(LaiPathError::invalid("bin frequencies sum to zero"));
        }

        let bin_count = frequencies.len();
        let scale = bin_count as f64 / sum;
        Ok(Self {
            edges: uniform_edges(bin_count),
            bins: frequencies.iter().map(|f| f * scale).collect(),
        })
    }

    /// Replace the bin values, keeping the edges.
    pub(crate) fn with_bins(&self, bins: Vec<f64>) -> Self {
        debug_assert_eq!(bins.len(), self.bins.len());
        Self {
            edges: self.edges.clone(),
            bins,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Sum of all bin values (equals the bin count for a normalized density)
    pub fn total_mass(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// Density value at path length `l`, zero outside the bins
    pub fn value_at(&self, l: f64) -> f64 {
        find_bin(&self.edges, l).map_or(0.0, |i| self.bins[i])
    }

    /// Integration breakpoints: every bin boundary inside `[0, 1]`.
    ///
    /// The nudged last edge is replaced by 1.0 so integrals run over the unit
    /// interval exactly.
    pub fn breakpoints(&self) -> Vec<f64> {
        let mut points: Vec<f64> = self.edges[..self.bin_count()].to_vec();
        points.push(1.0);
        points
    }

    pub fn rows(&self) -> impl Iterator<Item = HistogramRow> + '_ {
        self.bins.iter().enumerate().map(move |(i, &density)| HistogramRow {
            lower: self.edges[i],
            upper: self.edges[i + 1],
            density,
        })
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{:.2} {:.2} {:.3}", row.lower, row.upper, row.density)?;
        }
        Ok(())
    }
}

fn uniform_edges(bin_count: usize) -> Vec<f64> {
    let n = bin_count as f64;
    (0..=bin_count).map(|i| i as f64 / n).collect()
}

/// Index of the bin with `edges[i] <= x < edges[i + 1]`
fn find_bin(edges: &[f64], x: f64) -> Option<usize> {
    let n = edges.len().checked_sub(1)?;
    if !(x >= edges[0] && x < edges[n]) {
        return None;
    }
    let above = edges.partition_point(|&e| e <= x);
    Some(above - 1)
}
