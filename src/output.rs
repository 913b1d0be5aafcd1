use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use csv::Writer;

use crate::density::Density;
use crate::errors::{LaiPathError, Result};
use crate::estimator::EstimateStatus;
use crate::pipeline::LaiReport;

const REPORT_HEADER: &str = "Path Length Distribution Method\n\
Reference:\n\
1. Hu, R. et al. (2014). Indirect Measurement of Leaf Area Index on the Basis of Path Length Distribution. \
REMOTE SENS ENVIRON, 155, 239-247.\n\
2. Yan, G. et al. (2019). Review of indirect optical measurements of leaf area index: \
Recent advances, challenges, and perspectives. AGR FOREST METEOROL, 265, 390-411.\n";

/// `<dir>/<stem>_out.txt` next to the input file
pub fn default_report_path<P: AsRef<Path>>(input_path: P) -> PathBuf {
    let input_path = input_path.as_ref();
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("lai_path");
    input_path.with_file_name(format!("{}_out.txt", stem))
}

/// Plain text report: inputs, distribution table and result line
pub fn render_report(report: &LaiReport) -> String {
    report.to_string()
}

impl fmt::Display for LaiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let obs = &self.observation;
        write!(f, "{}", REPORT_HEADER)?;

        writeln!(f, "\nInput:")?;
        writeln!(f, "Zenith angle:\t{:.1}", obs.zenith_deg)?;
        writeln!(f, "G:\t\t{:.1}", obs.g)?;
        writeln!(f, "Gap fraction of large gaps:\t{:.4}", obs.gap_fraction_of_large_gaps)?;
        writeln!(f, "Gap fraction inside canopy:\t{:.4}", obs.gap_fraction_inside_canopy)?;
        writeln!(f, "Effective LAI (LAIe) = {:.4}", self.effective_lai)?;

        writeln!(f, "\nInput mode of path length distribution: {}", self.mode)?;

        if let Some(density) = &self.density {
            writeln!(f, "\nPath length distribution:\nmin  max  probability")?;
            write!(f, "{}", density)?;
        }

        if let Some(correction) = &self.correction {
            writeln!(f, "\nCorrected path length distribution:\nmin  max  probability")?;
            write!(f, "{}", correction.density)?;
        }

        let warnings = self.warnings();
        if !warnings.is_empty() {
            writeln!(f)?;
            for warning in warnings {
                writeln!(f, "Warning: {}", warning)?;
            }
        }

        let ci = self
            .clumping_index
            .map_or_else(|| "n/a".to_string(), |ci| format!("{:.3}", ci));
        writeln!(f, "\nResult: LAI_PATH = {:.2}\t\tClumping Index = {}", self.lai_path, ci)?;

        if let Some(converted) = self.lai_path_from_effective_lai {
            writeln!(f, "LAI_PATH from effective LAI = {:.2}", converted)?;
        }
        Ok(())
    }
}

/// Write the text report
pub fn write_text_report<P: AsRef<Path>>(path: P, report: &LaiReport) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_report(report))?;
    Ok(())
}

/// Write the density table to `<stem>_histogram.csv`
pub fn write_histogram_csv<P: AsRef<Path>>(stem_path: P, density: &Density) -> Result<PathBuf> {
    let output_path = suffixed(stem_path.as_ref(), "_histogram.csv");

    let mut writer = Writer::from_path(&output_path)?;
    writer.write_record(["Min", "Max", "Probability"])?;
    for row in density.rows() {
        writer.write_record(&[
            format!("{:.6}", row.lower),
            format!("{:.6}", row.upper),
            format!("{:.6}", row.density),
        ])?;
    }
    writer.flush().map_err(|e| LaiPathError::CsvOutput(csv::Error::from(e)))?;

    Ok(output_path)
}

/// Serialize the full report to `<stem>_summary.json`
pub fn write_json_summary<P: AsRef<Path>>(stem_path: P, report: &LaiReport) -> Result<PathBuf> {
    let output_path = suffixed(stem_path.as_ref(), "_summary.json");
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&output_path, json)?;
    Ok(output_path)
}

/// Append one line per measurement to `summary.csv` in `output_dir`
pub fn append_summary_csv<P: AsRef<Path>>(output_dir: P, filename: &str, report: &LaiReport) -> Result<()> {
    let summary_path = output_dir.as_ref().join("summary.csv");
    let file_exists = summary_path.exists();

    let mut writer = if file_exists {
        Writer::from_writer(fs::OpenOptions::new().append(true).open(&summary_path)?)
    } else {
        let mut writer = Writer::from_path(&summary_path)?;
        writer.write_record([
            "ID",
            "Mode",
            "Gap_Fraction_Inside_Canopy",
            "Gap_Fraction_Large_Gaps",
            "Zenith",
            "G",
            "LAIe",
            "LAI_PATH",
            "Clumping_Index",
            "Status",
            "Corrected",
        ])?;
        writer
    };

    let obs = &report.observation;
    let status = match report.estimate.status {
        EstimateStatus::NoInterception => "no_interception",
        EstimateStatus::Converged { .. } => "converged",
        EstimateStatus::IterationLimit { .. } => "iteration_limit",
        EstimateStatus::Unbracketed => "unbracketed",
    };
    writer.write_record(&[
        filename.to_string(),
        report.mode.clone(),
        format!("{:.6}", obs.gap_fraction_inside_canopy),
        format!("{:.6}", obs.gap_fraction_of_large_gaps),
        format!("{:.2}", obs.zenith_deg),
        format!("{:.3}", obs.g),
        format!("{:.6}", report.effective_lai),
        format!("{:.6}", report.lai_path),
        report.clumping_index.map_or_else(String::new, |ci| format!("{:.6}", ci)),
        status.to_string(),
        report.correction.is_some().to_string(),
    ])?;

    writer.flush().map_err(|e| LaiPathError::CsvOutput(csv::Error::from(e)))?;
    Ok(())
}

fn suffixed(stem_path: &Path, suffix: &str) -> PathBuf {
    let stem = stem_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("lai_path");
    stem_path.with_file_name(format!("{}{}", stem, suffix))
}
