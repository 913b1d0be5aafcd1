// src/pipeline.rs - one measurement from parsed input to report

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::canopy::{clumping_index, CanopyObservation};
use crate::config::Config;
use crate::correction::{correct_saturated_estimate, NearZeroCorrection};
use crate::density::{build_density, Density};
use crate::errors::Result;
use crate::estimator::{
    effective_lai_to_true_lai_circle_with, estimate_true_lai_circle_with, estimate_true_lai_with, EstimateStatus,
    LaiEstimate, SolverSettings,
};
use crate::measurement_io::{InputMeasurement, Measurement, PathLengthInput};
use crate::output::{append_summary_csv, default_report_path, write_histogram_csv, write_json_summary, write_text_report};

/// Everything reported for one measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaiReport {
    pub observation: CanopyObservation,
    pub mode: String,
    /// Effective LAI of the whole canopy, large gaps included
    pub effective_lai: f64,
    pub density: Option<Density>,
    pub estimate: LaiEstimate,
    pub correction: Option<NearZeroCorrection>,
    /// Share of path length values kept after rejecting negative ones
    pub accepted_fraction: f64,
    pub rejected_paths: usize,
    /// Final clumping-corrected LAI
    pub lai_path: f64,
    pub clumping_index: Option<f64>,
    /// Ellipse mode only: the same estimate reached through the effective LAI converter
    pub lai_path_from_effective_lai: Option<f64>,
}

impl LaiReport {
    /// Human readable notes about estimates that are not plain inversions
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.rejected_paths > 0 {
            warnings.push(format!(
                "{} negative path lengths were processed as large gaps",
                self.rejected_paths
            ));
        }

        match self.estimate.status {
            EstimateStatus::Unbracketed => warnings.push(format!(
                "LAImax could not be bracketed, estimate capped at LAI = {:.2}",
                self.estimate.true_lai
            )),
            EstimateStatus::IterationLimit { iterations } => warnings.push(format!(
                "LAImax search stopped after {} iterations, best estimate used",
                iterations
            )),
            _ => {}
        }

        if let Some(correction) = &self.correction {
            warnings.push(format!(
                "Too many path lengths close to 0: {:.4} of the distribution treated as large gaps",
                correction.reclassified_gap_fraction
            ));
            if correction.estimate.is_saturated() {
                warnings.push("Estimate still capped after the near-zero correction".to_string());
            }
        }

        if self.clumping_index.map_or(false, |ci| ci > 1.0) {
            warnings.push("Clumping index > 1, the inversion may have failed".to_string());
        }

        warnings
    }
}

/// Run the estimator on a parsed measurement
pub fn process_measurement(measurement: &Measurement, config: &Config) -> Result<LaiReport> {
    let settings = config.solver_settings();
    let observation = measurement.observation;
    observation.validate()?;

    let (density, accepted_fraction, rejected_paths) = match &measurement.path_lengths {
        PathLengthInput::Samples { accepted, total } => {
            let density = build_density(accepted, config.bin_count)?;
            let fraction = accepted.len() as f64 / *total as f64;
            (Some(density), fraction, total - accepted.len())
        }
        PathLengthInput::Distribution(frequencies) => (Some(Density::from_frequencies(frequencies)?), 1.0, 0),
        PathLengthInput::Ellipse => (None, 1.0, 0),
    };

    let mut report = match density {
        Some(density) => empirical_report(observation, density, accepted_fraction, config, &settings)?,
        None => ellipse_report(observation, &settings)?,
    };
    report.mode = measurement.path_lengths.mode_description();
    report.rejected_paths = rejected_paths;

    log::info!(
        "LAI_PATH = {:.2}, clumping index = {}",
        report.lai_path,
        report
            .clumping_index
            .map_or_else(|| "n/a".to_string(), |ci| format!("{:.3}", ci))
    );

    Ok(report)
}

fn empirical_report(
    observation: CanopyObservation,
    density: Density,
    accepted_fraction: f64,
    config: &Config,
    settings: &SolverSettings,
) -> Result<LaiReport> {
    let CanopyObservation {
        gap_fraction_inside_canopy: gap,
        zenith_deg,
        g,
        ..
    } = observation;

    let estimate = estimate_true_lai_with(&density, gap, zenith_deg, g, settings)?;
    let mut lai_path = estimate.true_lai * observation.canopy_cover() * accepted_fraction;

    let correction = if config.correct_near_zero_paths {
        correct_saturated_estimate(&density, &estimate, gap, zenith_deg, g, settings)?
    } else {
        None
    };
    if let Some(c) = &correction {
        lai_path = c.estimate.true_lai
            * observation.canopy_cover()
            * (1.0 - c.reclassified_gap_fraction)
            * accepted_fraction;
    }

    let effective_lai = observation.effective_lai();
    Ok(LaiReport {
        observation,
        mode: String::new(),
        effective_lai,
        density: Some(density),
        estimate,
        correction,
        accepted_fraction,
        rejected_paths: 0,
        lai_path,
        clumping_index: clumping_index(effective_lai, lai_path),
        lai_path_from_effective_lai: None,
    })
}

fn ellipse_report(observation: CanopyObservation, settings: &SolverSettings) -> Result<LaiReport> {
    let estimate = estimate_true_lai_circle_with(
        observation.gap_fraction_inside_canopy,
        observation.zenith_deg,
        observation.g,
        settings,
    )?;
    let lai_path = estimate.true_lai * observation.canopy_cover();

    let converted = effective_lai_to_true_lai_circle_with(
        observation.effective_lai_inside_canopy(),
        observation.zenith_deg,
        observation.g,
        settings,
    )?;

    let effective_lai = observation.effective_lai();
    Ok(LaiReport {
        observation,
        mode: String::new(),
        effective_lai,
        density: None,
        estimate,
        correction: None,
        accepted_fraction: 1.0,
        rejected_paths: 0,
        lai_path,
        clumping_index: clumping_index(effective_lai, lai_path),
        lai_path_from_effective_lai: Some(converted.true_lai * observation.canopy_cover()),
    })
}

/// Process one input file and write its outputs.
///
/// `output` is the report path for a single file, or the report directory in
/// batch mode (`batch_dir = true`).
pub fn process_file(
    input: InputMeasurement,
    output: Option<&Path>,
    batch_dir: bool,
    config: &Config,
) -> Result<LaiReport> {
    let InputMeasurement {
        measurement,
        path,
        filename,
    } = input;

    let report = process_measurement(&measurement, config)?;

    let report_path: PathBuf = match output {
        Some(dir) if batch_dir => dir.join(format!("{}_out.txt", filename)),
        Some(file) => file.to_path_buf(),
        None => default_report_path(&path),
    };
    write_text_report(&report_path, &report)?;
    log::info!("Report written to {}", report_path.display());

    let stem_path = report_path.with_file_name(&filename);
    if config.write_histogram_csv {
        if let Some(density) = &report.density {
            write_histogram_csv(&stem_path, density)?;
        }
    }
    if config.write_json_summary {
        write_json_summary(&stem_path, &report)?;
    }
    if batch_dir {
        if let Some(dir) = report_path.parent() {
            append_summary_csv(dir, &filename, &report)?;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement_io::parse_measurement;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn rejected_paths_scale_the_result() {
        let config = Config::default();
        let clean = "0.5\n0\n0\n0.5\n-1\n0.05\n0.15\n0.25\n0.35\n0.45\n0.55\n0.65\n0.75\n0.85\n1.0\n";
        let with_negatives = format!("{}-3\n-4\n", clean);

        let base = process_measurement(&parse_measurement(clean).unwrap(), &config).unwrap();
        let scaled = process_measurement(&parse_measurement(&with_negatives).unwrap(), &config).unwrap();

        assert_eq!(scaled.rejected_paths, 2);
        assert_approx_eq!(scaled.accepted_fraction, 10.0 / 12.0, 1e-15);
        assert_approx_eq!(scaled.lai_path, base.lai_path * 10.0 / 12.0, 1e-12);
        assert!(scaled.warnings()[0].starts_with("2 negative path lengths"));
    }

    #[test]
    fn large_gaps_reduce_lai_and_enter_clumping_index() {
        let config = Config::default();
        let m = parse_measurement("0.4\n0.2\n0\n0.5\n4\n1\n2\n3\n1\n").unwrap();
        let report = process_measurement(&m, &config).unwrap();

        assert_approx_eq!(report.lai_path, report.estimate.true_lai * 0.8, 1e-12);
        let total_gap = 0.2 + 0.8 * 0.4;
        assert_approx_eq!(report.effective_lai, -f64::ln(total_gap) / 0.5, 1e-12);
        assert_approx_eq!(report.clumping_index.unwrap(), report.effective_lai / report.lai_path, 1e-12);
        assert_eq!(report.mode, "Distribution (4 bins)");
    }

    #[test]
    fn ellipse_mode_reports_both_routes() {
        let m = parse_measurement("0.3\n0.1\n20\n0.5\n0\n").unwrap();
        let report = process_measurement(&m, &Config::default()).unwrap();
        assert!(report.density.is_none());
        let converted = report.lai_path_from_effective_lai.unwrap();
        assert_approx_eq!(converted, report.lai_path, 1e-3);
    }

    #[test]
    fn saturated_samples_trigger_correction() {
        // Nine near-zero paths and one long one: the first bin dominates
        let mut text = "0.5\n0\n0\n0.5\n-1\n".to_string();
        for _ in 0..9 {
            text.push_str("0.01\n");
        }
        text.push_str("1.0\n");
        let m = parse_measurement(&text).unwrap();

        let report = process_measurement(&m, &Config::default()).unwrap();
        assert!(report.estimate.is_saturated());
        let correction = report.correction.as_ref().unwrap();
        assert!(!correction.estimate.is_saturated());
        assert!(report.lai_path < 10.0);

        let mut disabled = Config::default();
        disabled.correct_near_zero_paths = false;
        let raw = process_measurement(&m, &disabled).unwrap();
        assert!(raw.correction.is_none());
        assert_eq!(raw.lai_path, 10.0);
    }

    #[test]
    fn correction_keeps_large_gaps_and_rejected_paths() {
        let mut text = "0.5\n0.2\n0\n0.5\n-1\n".to_string();
        for _ in 0..9 {
            text.push_str("0.01\n");
        }
        text.push_str("1.0\n-3\n");
        let m = parse_measurement(&text).unwrap();

        let report = process_measurement(&m, &Config::default()).unwrap();
        assert_eq!(report.rejected_paths, 1);
        assert_approx_eq!(report.accepted_fraction, 10.0 / 11.0, 1e-15);

        let c = report.correction.as_ref().unwrap();
        assert_approx_eq!(c.reclassified_gap_fraction, 0.9, 1e-12);
        let expected = c.estimate.true_lai * (1.0 - 0.2) * (1.0 - c.reclassified_gap_fraction) * (10.0 / 11.0);
        assert_approx_eq!(report.lai_path, expected, 1e-12);

        let total_gap = 0.2 + 0.8 * 0.5;
        assert_approx_eq!(report.effective_lai, -f64::ln(total_gap) / 0.5, 1e-12);
        assert_approx_eq!(report.clumping_index.unwrap(), report.effective_lai / expected, 1e-9);
    }
}
