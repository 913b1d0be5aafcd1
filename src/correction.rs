// src/correction.rs - Near-zero path lengths reclassified as large gaps
//
// Short paths make the first bin so heavy that no LAImax inside the bracket
// reproduces the measured gap fraction. They are moved out of the density and
// counted as an extra large-gap fraction instead.

use serde::Serialize;

use crate::density::Density;
use crate::errors::Result;
use crate::estimator::{estimate_true_lai_with, LaiEstimate, SolverSettings};

/// Outcome of re-running the inversion on the corrected density
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearZeroCorrection {
    pub density: Density,
    /// Share of the uncorrected density moved to large gaps (`bin[0] / N`)
    pub reclassified_gap_fraction: f64,
    pub estimate: LaiEstimate,
}

/// Drop the first bin and rescale the rest so the bins still sum to `N`.
///
/// Returns `None` when the first bin is empty or holds all the mass.
pub fn reclassify_near_zero_paths(density: &Density) -> Option<(Density, f64)> {
    let n = density.bin_count() as f64;
    let first = density.bins()[0];
    let fraction = first / n;
    if first <= 0.0 || fraction >= 1.0 - f64::EPSILON {
        return None;
    }

    let scale = 1.0 / (1.0 - fraction);
    let mut bins: Vec<f64> = density.bins().iter().map(|b| b * scale).collect();
    bins[0] = 0.0;
    Some((density.with_bins(bins), fraction))
}

/// Re-run a saturated empirical estimate on the corrected density.
///
/// Estimates that are not saturated are left alone (`Ok(None)`).
pub fn correct_saturated_estimate(
    density: &Density,
    estimate: &LaiEstimate,
    gap_fraction: f64,
    zenith_deg: f64,
    g: f64,
    settings: &SolverSettings,
) -> Result<Option<NearZeroCorrection>> {
    if !estimate.is_saturated() {
        return Ok(None);
    }

    let Some((corrected, fraction)) = reclassify_near_zero_paths(density) else {
        log::warn!("Saturated estimate but the first bin cannot be reclassified");
        return Ok(None);
    };

    log::warn!(
        "Too many near-zero path lengths: treating {:.4} of the distribution as large gaps",
        fraction
    );
    let estimate = estimate_true_lai_with(&corrected, gap_fraction, zenith_deg, g, settings)?;

    Ok(Some(NearZeroCorrection {
        density: corrected,
        reclassified_gap_fraction: fraction,
        estimate,
    }))
}
