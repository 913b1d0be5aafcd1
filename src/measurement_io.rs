// src/measurement_io.rs - Measurement text files

use std::fs;
use std::path::{Path, PathBuf};

use crate::canopy::CanopyObservation;
use crate::errors::{LaiPathError, Result};

/// Path lengths below this are rejected rather than clamped to zero
pub const NEGATIVE_PATH_TOLERANCE: f64 = -1e-6;

/// Path length information that follows the five header lines
#[derive(Debug, Clone, PartialEq)]
pub enum PathLengthInput {
    /// Mode < 0: raw relative path lengths
    Samples {
        accepted: Vec<f64>,
        /// Values that were read, including rejected negative ones
        total: usize,
    },
    /// Mode > 0: relative frequency of each of `mode` bins
    Distribution(Vec<f64>),
    /// Mode 0: nothing measured, ellipse section assumption
    Ellipse,
}

impl PathLengthInput {
    pub fn mode_description(&self) -> String {
        match self {
            PathLengthInput::Samples { .. } => "Path lengths (-1)".to_string(),
            PathLengthInput::Distribution(bins) => format!("Distribution ({} bins)", bins.len()),
            PathLengthInput::Ellipse => "no input, ellipse assumption (0)".to_string(),
        }
    }
}

/// One parsed measurement file
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub observation: CanopyObservation,
    pub path_lengths: PathLengthInput,
}

/// A measurement together with where it came from
pub struct InputMeasurement {
    pub measurement: Measurement,
    pub path: PathBuf,
    pub filename: String,
}

/// Get all `.txt` measurement files in a directory, sorted by name
pub fn get_txt_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.is_dir() {
        return Err(LaiPathError::InvalidPath(dir_path.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        let is_txt = path
            .extension()
            .map_or(false, |ext| ext.to_ascii_lowercase() == "txt");
        // Skip reports written by earlier runs
        let is_report = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map_or(false, |s| s.ends_with("_out"));
        if path.is_file() && is_txt && !is_report {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Load and parse a measurement file
pub fn load_measurement<P: AsRef<Path>>(path: P) -> Result<InputMeasurement> {
    let path = path.as_ref();

    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LaiPathError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let text = fs::read_to_string(path)?;
    let measurement = parse_measurement(&text)?;

    Ok(InputMeasurement {
        measurement,
        path: path.to_path_buf(),
        filename,
    })
}

/// Parse the measurement text format.
///
/// ```text
/// 0.35      gap fraction inside canopy
/// 0.05      gap fraction of large gaps
/// 0         zenith angle (degrees)
/// 0.5       leaf projection function G
/// -1        mode: <0 path lengths, >0 number of bins, 0 ellipse
/// 1.2       data lines up to the first blank line
/// ```
///
/// Only the first token on each line is read; anything after it is a comment.
pub fn parse_measurement(text: &str) -> Result<Measurement> {
    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

    let (n, line) = next_header(&mut lines, "gap fraction inside canopy")?;
    let gap_fraction_inside_canopy = first_number(n, line)?;
    let (n, line) = next_header(&mut lines, "gap fraction of large gaps")?;
    let gap_fraction_of_large_gaps = first_number(n, line)?;
    let (n, line) = next_header(&mut lines, "zenith angle")?;
    let zenith_deg = first_number(n, line)?;
    let (n, line) = next_header(&mut lines, "leaf projection function G")?;
    let g = first_number(n, line)?;
    let (n, line) = next_header(&mut lines, "path length mode")?;
    let mode = first_integer(n, line)?;

    let observation = CanopyObservation {
        gap_fraction_inside_canopy,
        gap_fraction_of_large_gaps,
        zenith_deg,
        g,
    };
    observation.validate()?;

    let data = lines
        .take_while(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| first_number(n, line))
        .collect::<Result<Vec<f64>>>();

    let path_lengths = match mode {
        m if m < 0 => {
            let values = data?;
            let total = values.len();
            let mut accepted = Vec::with_capacity(total);
            for value in values {
                if value < NEGATIVE_PATH_TOLERANCE {
                    log::warn!("Path length {} < 0 will be processed as large gaps", value);
                } else {
                    accepted.push(value.max(0.0));
                }
            }
            PathLengthInput::Samples { accepted, total }
        }
        m if m > 0 => {
            let bins = data?;
            if bins.len() != m as usize {
                return Err(LaiPathError::invalid(format!(
                    "mode {} expects {} bin frequencies, found {}",
                    m,
                    m,
                    bins.len()
                )));
            }
            PathLengthInput::Distribution(bins)
        }
        _ => PathLengthInput::Ellipse,
    };

    Ok(Measurement {
        observation,
        path_lengths,
    })
}

fn next_header<'a, I>(lines: &mut I, name: &str) -> Result<(usize, &'a str)>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    lines.next().ok_or_else(|| LaiPathError::Parse {
        line: 0,
        message: format!("missing {}", name),
    })
}

fn first_token(line_number: usize, line: &str) -> Result<&str> {
    line.split_whitespace().next().ok_or_else(|| LaiPathError::Parse {
        line: line_number,
        message: "empty line".to_string(),
    })
}

fn first_number(line_number: usize, line: &str) -> Result<f64> {
    let token = first_token(line_number, line)?;
    token.parse::<f64>().map_err(|e| LaiPathError::Parse {
        line: line_number,
        message: format!("'{}' is not a number: {}", token, e),
    })
}

fn first_integer(line_number: usize, line: &str) -> Result<i64> {
    let token = first_token(line_number, line)?;
    token.parse::<i64>().map_err(|e| LaiPathError::Parse {
        line: line_number,
        message: format!("'{}' is not an integer mode: {}", token, e),
    })
}
