use assert_approx_eq::assert_approx_eq;

use lai_path_lib::gap_model::{weighted_path, GapBias};
use lai_path_lib::quadrature::QuadratureSettings;
use lai_path_lib::root_finding::{brent, RootOutcome, RootSettings};
use lai_path_lib::{
    build_density, effective_lai_to_true_lai_circle, estimate_true_lai, estimate_true_lai_circle, Density,
    EstimateStatus, LaiPathError, LAI_MAX,
};

/// Root of `(1 - e^{-L}) / L = 0.5`
fn uniform_root() -> f64 {
    let (mut lo, mut hi) = (0.1f64, 10.0f64);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if (1.0 - (-mid).exp()) / mid > 0.5 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

#[test]
fn uniform_samples_reproduce_closed_form_lai() {
    let samples = [0.05, 0.15, 0.25, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85, 1.0];
    let density = build_density(&samples, 10).unwrap();
    for &bin in density.bins() {
        assert_eq!(bin, 1.0);
    }

    // Mean path 0.5 and G 0.5 cancel, leaving LAImax itself
    let estimate = estimate_true_lai(&density, 0.5, 0.0, 0.5).unwrap();
    assert_approx_eq!(estimate.true_lai, uniform_root(), 1e-4);
    assert!(estimate.true_lai > -f64::ln(0.5) / 0.5 * 0.5);
}

#[test]
fn sample_on_a_bin_edge_opens_the_next_bin() {
    // Each k/10 sample sits on edge k, so it counts in bin k; 1.0 shares the last bin
    let samples = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
    let density = build_density(&samples, 10).unwrap();
    assert_eq!(density.bins(), &[0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0]);
    assert_approx_eq!(density.total_mass(), 10.0, 1e-12);
}

#[test]
fn scaled_samples_give_identical_estimates() {
    let samples: Vec<f64> = (1..=50).map(|i| ((i * 17) % 23) as f64 + 1.0).collect();
    let scaled: Vec<f64> = samples.iter().map(|s| s * 250.0).collect();

    let a = estimate_true_lai(&build_density(&samples, 25).unwrap(), 0.3, 10.0, 0.5).unwrap();
    let b = estimate_true_lai(&build_density(&scaled, 25).unwrap(), 0.3, 10.0, 0.5).unwrap();
    assert_approx_eq!(a.true_lai, b.true_lai, 1e-9);
}

#[test]
fn lai_never_decreases_with_denser_canopy() {
    let samples: Vec<f64> = (0..200).map(|i| ((i as f64) * 0.37).sin().abs() + 0.05).collect();
    let density = build_density(&samples, 25).unwrap();

    let mut previous = 0.0;
    for gap in [0.95, 0.8, 0.65, 0.5, 0.35, 0.2, 0.1, 0.05, 0.02] {
        let estimate = estimate_true_lai(&density, gap, 0.0, 0.5).unwrap();
        assert!(estimate.true_lai >= previous, "gap {} gave {}", gap, estimate.true_lai);
        previous = estimate.true_lai;
    }
}

#[test]
fn lai_stays_monotone_through_saturation() {
    // Mass in the first bin keeps the predicted gap high, so low gap fractions
    // end up unbracketed
    let density = Density::from_frequencies(&[1.0; 8]).unwrap();

    let mut previous = 0.0;
    let mut statuses = Vec::new();
    for gap in [0.5, 0.2, 0.1, 0.05, 0.03, 0.025, 0.01, 0.001] {
        let estimate = estimate_true_lai(&density, gap, 0.0, 0.5).unwrap();
        assert!(estimate.true_lai >= previous, "gap {} gave {}", gap, estimate.true_lai);
        assert!(estimate.true_lai <= LAI_MAX);
        previous = estimate.true_lai;
        statuses.push(estimate.status);
    }

    assert!(matches!(statuses[0], EstimateStatus::Converged { .. }));
    assert_eq!(statuses.last(), Some(&EstimateStatus::Unbracketed));
    assert_eq!(previous, LAI_MAX);
}

#[test]
fn solver_root_respects_bracket_or_signals_saturation() {
    let settings = QuadratureSettings::default();
    let densities = [
        Density::from_frequencies(&[1.0; 8]).unwrap(),
        Density::from_frequencies(&[10.0, 1.0, 0.0, 0.0, 0.0]).unwrap(),
        Density::from_frequencies(&[0.0, 0.0, 1.0, 5.0, 9.0]).unwrap(),
    ];

    for density in &densities {
        for gap in [0.1, 0.4, 0.7] {
            let x_lo = -f64::ln(gap);
            let x_hi = 10.0 * x_lo;
            let cost = GapBias::new(density, gap, 1.0, settings);
            let outcome = brent(|x| cost.evaluate(x), x_lo, x_hi, &RootSettings::default()).unwrap();
            match outcome {
                RootOutcome::Converged(est) | RootOutcome::IterationLimit(est) => {
                    assert!(est.root >= x_lo && est.root <= x_hi);
                }
                RootOutcome::Unbracketed { .. } => {
                    let estimate = estimate_true_lai(density, gap, 0.0, 0.5).unwrap();
                    assert_eq!(estimate.status, EstimateStatus::Unbracketed);
                    assert_eq!(estimate.true_lai, LAI_MAX);
                }
            }
        }
    }
}

#[test]
fn mass_is_preserved_for_many_inputs() {
    for seed in 1..20u64 {
        let samples: Vec<f64> = (0..(seed * 13))
            .map(|i| ((i * seed * 7919) % 1000) as f64 / 10.0)
            .collect();
        if samples.iter().all(|s| *s == samples[0]) {
            continue;
        }
        let bins = (seed as usize % 30) + 1;
        let density = build_density(&samples, bins).unwrap();
        assert_approx_eq!(density.total_mass(), bins as f64, 1e-9);
        let mean = weighted_path(&density, 1.0, &QuadratureSettings::default());
        assert!(mean > 0.0 && mean <= 1.0 + 1e-9, "mean path {}", mean);
    }
}

#[test]
fn identical_samples_are_invalid() {
    assert!(matches!(
        build_density(&[3.0; 12], 25),
        Err(LaiPathError::InvalidInput(_))
    ));
}

#[test]
fn no_interception_gives_zero_for_both_estimators() {
    let density = Density::from_frequencies(&[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(estimate_true_lai(&density, 1.0, 0.0, 0.5).unwrap().true_lai, 0.0);
    assert_eq!(estimate_true_lai_circle(1.0, 0.0, 0.5).unwrap().true_lai, 0.0);
}

#[test]
fn converter_matches_direct_ellipse_estimate_bit_for_bit() {
    for (eff, zenith, g) in [(0.5, 0.0, 0.5), (2.5, 45.0, 0.5), (4.0, 10.0, 0.9)] {
        let gap = (-eff * g / (zenith * std::f64::consts::PI / 180.0).cos()).exp();
        let direct = estimate_true_lai_circle(gap, zenith, g).unwrap();
        let converted = effective_lai_to_true_lai_circle(eff, zenith, g).unwrap();
        assert_eq!(direct, converted);
    }
}

#[test]
fn ellipse_lai_exceeds_effective_lai() {
    // Chord lengths through an ellipse are clumped, so the correction raises LAI
    for gap in [0.2, 0.5, 0.8] {
        let estimate = estimate_true_lai_circle(gap, 0.0, 0.5).unwrap();
        let effective = -f64::ln(gap) / 0.5;
        assert!(estimate.true_lai >= effective, "gap {}", gap);
    }
}
