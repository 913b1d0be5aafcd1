// src/canopy.rs - Canopy level quantities around the core inversion

use serde::{Deserialize, Serialize};

use crate::errors::{LaiPathError, Result};
use crate::estimator::{cos_deg, validate_gap_fraction, validate_geometry};

/// Physical inputs of one measurement.
///
/// Large gaps (for instance gaps wider than about ten leaf widths) are best
/// removed before the path length analysis; their fraction is then carried
/// separately here. Leave it at zero when large gaps were not removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanopyObservation {
    pub gap_fraction_inside_canopy: f64,
    pub gap_fraction_of_large_gaps: f64,
    pub zenith_deg: f64,
    /// Leaf projection function
    pub g: f64,
}

impl CanopyObservation {
    pub fn validate(&self) -> Result<()> {
        validate_gap_fraction(self.gap_fraction_inside_canopy)?;
        if !(self.gap_fraction_of_large_gaps >= 0.0 && self.gap_fraction_of_large_gaps < 1.0) {
            return Err(LaiPathError::invalid(format!(
                "gap fraction of large gaps must be in [0, 1), got {}",
                self.gap_fraction_of_large_gaps
            )));
        }
        validate_geometry(self.zenith_deg, self.g)
    }

    /// Gap fraction including large gaps
    pub fn total_gap_fraction(&self) -> f64 {
        self.gap_fraction_of_large_gaps + (1.0 - self.gap_fraction_of_large_gaps) * self.gap_fraction_inside_canopy
    }

    /// Effective LAI of the whole canopy (large gaps included)
    pub fn effective_lai(&self) -> f64 {
        effective_lai(self.total_gap_fraction(), self.zenith_deg, self.g)
    }

    pub fn effective_lai_inside_canopy(&self) -> f64 {
        effective_lai(self.gap_fraction_inside_canopy, self.zenith_deg, self.g)
    }

    /// Share of the canopy not covered by large gaps
    pub fn canopy_cover(&self) -> f64 {
        1.0 - self.gap_fraction_of_large_gaps
    }
}

/// `-ln(gap) / G · cos(zenith)`
pub fn effective_lai(gap_fraction: f64, zenith_deg: f64, g: f64) -> f64 {
    -gap_fraction.ln() / g * cos_deg(zenith_deg)
}

/// Effective over true LAI. `None` when the true LAI is zero.
///
/// Values above one mean the inversion failed to correct for clumping.
pub fn clumping_index(effective_lai: f64, true_lai: f64) -> Option<f64> {
    if true_lai > 0.0 {
        Some(effective_lai / true_lai)
    } else {
        None
    }
}
