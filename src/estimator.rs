// src/estimator.rs - True LAI from gap fraction and path length distribution
//
// LAImax is solved so the predicted gap fraction matches the measured one, then
// LAI = LAImax * mean_path / G * cos(zenith).
// Hu et al. (2014), Remote Sensing of Environment 155, 239-247.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::density::Density;
use crate::errors::{LaiPathError, Result};
use crate::gap_model::{weighted_path, EllipseDensity, GapBias, PathLengthDensity};
use crate::quadrature::QuadratureSettings;
use crate::root_finding::{brent, RootOutcome, RootSettings};

/// Ceiling for every estimate, and the value returned when the inversion
/// cannot bracket `LAImax`
pub const LAI_MAX: f64 = 10.0;

/// Numerical settings shared by both estimators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    pub root: RootSettings,
    pub quadrature: QuadratureSettings,
    /// Upper cap on the true LAI, also reported when the root is not bracketed
    pub lai_max: f64,
    /// Upper bracket as a multiple of the lower one, measured density
    pub empirical_bracket_factor: f64,
    /// Upper bracket as a multiple of the lower one, ellipse density
    pub analytic_bracket_factor: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            root: RootSettings::default(),
            quadrature: QuadratureSettings::default(),
            lai_max: LAI_MAX,
            empirical_bracket_factor: 10.0,
            analytic_bracket_factor: 20.0,
        }
    }
}

/// How the estimate was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EstimateStatus {
    /// Gap fraction of one, nothing to invert
    NoInterception,
    Converged { iterations: usize },
    /// Iteration cap hit, best estimate kept
    IterationLimit { iterations: usize },
    /// Measured gap fraction unreachable inside the bracket; LAI is the ceiling
    Unbracketed,
}

/// Result of a single inversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LaiEstimate {
    pub true_lai: f64,
    /// `None` when the root was not bracketed
    pub lai_max: Option<f64>,
    /// Mean normalized path length of the density
    pub weighted_path: f64,
    pub status: EstimateStatus,
}

impl LaiEstimate {
    /// True when the value is the ceiling rather than an inversion result
    pub fn is_saturated(&self) -> bool {
        self.status == EstimateStatus::Unbracketed
    }
}

/// True LAI from a measured path length density with default settings
pub fn estimate_true_lai(density: &Density, gap_fraction: f64, zenith_deg: f64, g: f64) -> Result<LaiEstimate> {
    estimate_true_lai_with(density, gap_fraction, zenith_deg, g, &SolverSettings::default())
}

/// True LAI from a measured path length density
pub fn estimate_true_lai_with(
    density: &Density,
    gap_fraction: f64,
    zenith_deg: f64,
    g: f64,
    settings: &SolverSettings,
) -> Result<LaiEstimate> {
    validate_gap_fraction(gap_fraction)?;
    validate_geometry(zenith_deg, g)?;

    let weighted = weighted_path(density, 1.0, &settings.quadrature);
    if gap_fraction == 1.0 {
        return Ok(no_interception(weighted));
    }

    let x_lo = -gap_fraction.ln();
    let x_hi = x_lo * settings.empirical_bracket_factor;
    let cost = GapBias::new(density, gap_fraction, 1.0, settings.quadrature);
    let outcome = brent(|lai_max| cost.evaluate(lai_max), x_lo, x_hi, &settings.root)?;

    Ok(finish(outcome, weighted, zenith_deg, g, settings, (x_lo, x_hi)))
}

/// True LAI under the ellipse path length assumption with default settings
pub fn estimate_true_lai_circle(gap_fraction: f64, zenith_deg: f64, g: f64) -> Result<LaiEstimate> {
    estimate_true_lai_circle_with(gap_fraction, zenith_deg, g, &SolverSettings::default())
}

/// True LAI under the ellipse path length assumption.
///
/// Only meant for instruments that report a gap fraction without any path
/// length information.
pub fn estimate_true_lai_circle_with(
    gap_fraction: f64,
    zenith_deg: f64,
    g: f64,
    settings: &SolverSettings,
) -> Result<LaiEstimate> {
    validate_gap_fraction(gap_fraction)?;
    validate_geometry(zenith_deg, g)?;

    let density = EllipseDensity;
    let normalization = density.normalization(&settings.quadrature);
    let weighted = weighted_path(&density, normalization, &settings.quadrature);
    if gap_fraction == 1.0 {
        return Ok(no_interception(weighted));
    }

    let cos_zenith = cos_deg(zenith_deg);
    let effective_lai = -gap_fraction.ln() / g * cos_zenith;
    let x_lo = effective_lai * g / cos_zenith;
    let x_hi = x_lo * settings.analytic_bracket_factor;

    let cost = GapBias::new(&density, gap_fraction, normalization, settings.quadrature);
    let outcome = brent(|lai_max| cost.evaluate(lai_max), x_lo, x_hi, &settings.root)?;

    Ok(finish(outcome, weighted, zenith_deg, g, settings, (x_lo, x_hi)))
}

/// Convert an effective LAI to true LAI under the ellipse assumption
pub fn effective_lai_to_true_lai_circle(effective_lai: f64, zenith_deg: f64, g: f64) -> Result<LaiEstimate> {
    effective_lai_to_true_lai_circle_with(effective_lai, zenith_deg, g, &SolverSettings::default())
}

pub fn effective_lai_to_true_lai_circle_with(
    effective_lai: f64,
    zenith_deg: f64,
    g: f64,
    settings: &SolverSettings,
) -> Result<LaiEstimate> {
    if !effective_lai.is_finite() || effective_lai < 0.0 {
        return Err(LaiPathError::invalid(format!(
            "effective LAI must be finite and >= 0, got {}",
            effective_lai
        )));
    }
    validate_geometry(zenith_deg, g)?;

    let gap_fraction = (-effective_lai * g / cos_deg(zenith_deg)).exp();
    if gap_fraction <= 0.0 {
        return Err(LaiPathError::invalid(format!(
            "effective LAI {} at zenith {} with G {} implies a gap fraction below f64 range",
            effective_lai, zenith_deg, g
        )));
    }
    estimate_true_lai_circle_with(gap_fraction, zenith_deg, g, settings)
}

pub(crate) fn cos_deg(zenith_deg: f64) -> f64 {
    (zenith_deg * PI / 180.0).cos()
}

pub(crate) fn validate_gap_fraction(gap_fraction: f64) -> Result<()> {
    if gap_fraction > 0.0 && gap_fraction <= 1.0 {
        Ok(())
    } else {
        Err(LaiPathError::invalid(format!(
            "gap fraction must be in (0, 1], got {}",
            gap_fraction
        )))
    }
}

pub(crate) fn validate_geometry(zenith_deg: f64, g: f64) -> Result<()> {
    if !(zenith_deg >= 0.0 && zenith_deg < 90.0) {
        return Err(LaiPathError::invalid(format!(
            "zenith angle must be in [0, 90) degrees, got {}",
            zenith_deg
        )));
    }
    if !(g > 0.0 && g <= 1.0) {
        return Err(LaiPathError::invalid(format!(
            "leaf projection G must be in (0, 1], got {}",
            g
        )));
    }
    Ok(())
}

fn no_interception(weighted: f64) -> LaiEstimate {
    LaiEstimate {
        true_lai: 0.0,
        lai_max: Some(0.0),
        weighted_path: weighted,
        status: EstimateStatus::NoInterception,
    }
}

fn finish(
    outcome: RootOutcome,
    weighted: f64,
    zenith_deg: f64,
    g: f64,
    settings: &SolverSettings,
    bracket: (f64, f64),
) -> LaiEstimate {
    // Solved estimates never exceed the unbracketed ceiling
    let scale = |lai_max: f64| {
        let lai = lai_max * weighted / g * cos_deg(zenith_deg);
        if lai > settings.lai_max {
            log::warn!("LAI {:.4} above the ceiling, reporting LAI = {}", lai, settings.lai_max);
            settings.lai_max
        } else {
            lai
        }
    };

    match outcome {
        RootOutcome::Converged(est) => {
            log::debug!(
                "LAImax {:.4} after {} iterations, weighted path {:.4}",
                est.root,
                est.iterations,
                weighted
            );
            LaiEstimate {
                true_lai: scale(est.root),
                lai_max: Some(est.root),
                weighted_path: weighted,
                status: EstimateStatus::Converged { iterations: est.iterations },
            }
        }
        RootOutcome::IterationLimit(est) => {
            log::warn!(
                "LAImax search stopped after {} iterations in [{:.6}, {:.6}], using {:.4}",
                est.iterations,
                est.lower,
                est.upper,
                est.root
            );
            LaiEstimate {
                true_lai: scale(est.root),
                lai_max: Some(est.root),
                weighted_path: weighted,
                status: EstimateStatus::IterationLimit { iterations: est.iterations },
            }
        }
        RootOutcome::Unbracketed { f_lower, f_upper } => {
            log::warn!(
                "LAImax bracket [{:.4}, {:.4}] does not straddle the measured gap fraction \
                 (bias {:.4} and {:.4}), reporting LAI = {}",
                bracket.0,
                bracket.1,
                f_lower,
                f_upper,
                settings.lai_max
            );
            LaiEstimate {
                true_lai: settings.lai_max,
                lai_max: None,
                weighted_path: weighted,
                status: EstimateStatus::Unbracketed,
            }
        }
    }
}
