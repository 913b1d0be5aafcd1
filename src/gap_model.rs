// src/gap_model.rs - Predicted gap fraction over a path length density
//
// gap(LAImax) = integral of exp(-LAImax * l) * P(l) over [0, 1]
// (Eq. 13 of Hu et al., 2014).

use crate::density::Density;
use crate::quadrature::{integrate_segmented, integrate_upper_singular, Integral, QuadratureSettings};

/// A path length density on `[0, 1]` that can be integrated against a weight
pub trait PathLengthDensity {
    /// Density value at `l`, possibly unnormalized
    fn kernel(&self, l: f64) -> f64;

    /// `∫₀¹ weight(l)·kernel(l) dl`
    fn integrate_weighted<W: Fn(f64) -> f64>(&self, weight: W, settings: &QuadratureSettings) -> Integral;

    /// `∫₀¹ kernel(l) dl`
    fn normalization(&self, settings: &QuadratureSettings) -> f64 {
        self.integrate_weighted(|_| 1.0, settings).value
    }
}

impl PathLengthDensity for Density {
    fn kernel(&self, l: f64) -> f64 {
        self.value_at(l)
    }

    /// Segmented at every bin boundary
    fn integrate_weighted<W: Fn(f64) -> f64>(&self, weight: W, settings: &QuadratureSettings) -> Integral {
        integrate_segmented(|l| weight(l) * self.value_at(l), &self.breakpoints(), settings)
    }
}

/// Path length density of a random chord through an ellipse section,
/// `P(l) = l / sqrt(1 - l²)`. Used when no measured distribution exists
/// (e.g. LAI-2000 style instruments).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EllipseDensity;

impl PathLengthDensity for EllipseDensity {
    fn kernel(&self, l: f64) -> f64 {
        l / (1.0 - l * l).sqrt()
    }

    /// Singular at `l = 1`
    fn integrate_weighted<W: Fn(f64) -> f64>(&self, weight: W, settings: &QuadratureSettings) -> Integral {
        integrate_upper_singular(|l| weight(l) * self.kernel(l), 0.0, 1.0, settings)
    }
}

/// Cost whose zero in `LAImax` reproduces the measured gap fraction
#[derive(Debug, Clone, Copy)]
pub struct GapBias<'a, D: PathLengthDensity> {
    density: &'a D,
    gap_fraction: f64,
    normalization: f64,
    settings: QuadratureSettings,
}

impl<'a, D: PathLengthDensity> GapBias<'a, D> {
    /// `normalization` divides every integral; pass 1.0 for a density that
    /// already integrates to one.
    pub fn new(density: &'a D, gap_fraction: f64, normalization: f64, settings: QuadratureSettings) -> Self {
        Self {
            density,
            gap_fraction,
            normalization,
            settings,
        }
    }

    /// `∫₀¹ exp(-LAImax·l)·P(l) dl`
    pub fn predicted_gap(&self, lai_max: f64) -> f64 {
        let integral = self
            .density
            .integrate_weighted(|l| (-lai_max * l).exp(), &self.settings);
        if !integral.converged {
            log::debug!(
                "Gap integral for LAImax {:.4} not converged (error {:.3e})",
                lai_max,
                integral.abs_error
            );
        }
        integral.value / self.normalization
    }

    /// Predicted minus measured gap fraction
    pub fn evaluate(&self, lai_max: f64) -> f64 {
        self.predicted_gap(lai_max) - self.gap_fraction
    }
}

/// `∫₀¹ l·P(l) dl / normalization`, the mean normalized path length
pub fn weighted_path<D: PathLengthDensity>(density: &D, normalization: f64, settings: &QuadratureSettings) -> f64 {
    density.integrate_weighted(|l| l, settings).value / normalization
}
