// src/config.rs - Run configuration loaded from TOML

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::density::DEFAULT_BIN_COUNT;
use crate::errors::{LaiPathError, Result};
use crate::estimator::{SolverSettings, LAI_MAX};
use crate::quadrature::QuadratureSettings;
use crate::root_finding::RootSettings;

/// Configuration for a run
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Measurement file or directory of measurement files
    #[serde(default = "default_input_path")]
    pub input_path: String,

    /// Report file (single input) or directory (batch); next to the input when unset
    #[serde(default)]
    pub output_path: Option<String>,

    // Histogram construction
    #[serde(default = "default_bin_count")]
    pub bin_count: usize,

    // Root finding
    #[serde(default = "default_root_tolerance")]
    pub root_tolerance: f64,

    #[serde(default)]
    pub root_rel_tolerance: f64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_lai_max")]
    pub lai_max: f64,

    #[serde(default = "default_empirical_bracket_factor")]
    pub empirical_bracket_factor: f64,

    #[serde(default = "default_analytic_bracket_factor")]
    pub analytic_bracket_factor: f64,

    // Quadrature
    #[serde(default = "default_integration_abs_tolerance")]
    pub integration_abs_tolerance: f64,

    #[serde(default = "default_integration_limit")]
    pub integration_limit: usize,

    /// Reclassify near-zero path lengths as large gaps when the estimate saturates
    #[serde(default = "default_true")]
    pub correct_near_zero_paths: bool,

    // Outputs
    #[serde(default = "default_true")]
    pub write_histogram_csv: bool,

    #[serde(default)]
    pub write_json_summary: bool,
}

fn default_input_path() -> String {
    "./input.txt".to_string()
}

fn default_bin_count() -> usize {
    DEFAULT_BIN_COUNT
}

fn default_root_tolerance() -> f64 {
    1e-4
}

fn default_max_iterations() -> usize {
    100
}

fn default_lai_max() -> f64 {
    LAI_MAX
}

fn default_empirical_bracket_factor() -> f64 {
    10.0
}

fn default_analytic_bracket_factor() -> f64 {
    20.0
}

fn default_integration_abs_tolerance() -> f64 {
    1e-7
}

fn default_integration_limit() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: None,
            bin_count: DEFAULT_BIN_COUNT,
            root_tolerance: 1e-4,
            root_rel_tolerance: 0.0,
            max_iterations: 100,
            lai_max: LAI_MAX,
            empirical_bracket_factor: 10.0,
            analytic_bracket_factor: 20.0,
            integration_abs_tolerance: 1e-7,
            integration_limit: 1000,
            correct_near_zero_paths: true,
            write_histogram_csv: true,
            write_json_summary: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LaiPathError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| LaiPathError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(LaiPathError::InvalidPath(input_path));
        }

        if self.bin_count == 0 {
            return Err(LaiPathError::Config("bin_count must be > 0".to_string()));
        }

        if !(self.root_tolerance >= 0.0 && self.root_rel_tolerance >= 0.0)
            || self.root_tolerance + self.root_rel_tolerance <= 0.0
        {
            return Err(LaiPathError::Config(
                "root_tolerance and root_rel_tolerance must be >= 0 and not both zero".to_string(),
            ));
        }

        if self.max_iterations == 0 {
            return Err(LaiPathError::Config("max_iterations must be > 0".to_string()));
        }

        if !(self.lai_max > 0.0) {
            return Err(LaiPathError::Config("lai_max must be > 0.0".to_string()));
        }

        if !(self.empirical_bracket_factor > 1.0) || !(self.analytic_bracket_factor > 1.0) {
            return Err(LaiPathError::Config(
                "bracket factors must be > 1.0".to_string(),
            ));
        }

        if !(self.integration_abs_tolerance > 0.0) {
            return Err(LaiPathError::Config(
                "integration_abs_tolerance must be > 0.0".to_string(),
            ));
        }

        if self.integration_limit == 0 {
            return Err(LaiPathError::Config("integration_limit must be > 0".to_string()));
        }

        Ok(())
    }

    /// Numerical settings for the estimators
    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            root: RootSettings {
                abs_tolerance: self.root_tolerance,
                rel_tolerance: self.root_rel_tolerance,
                max_iterations: self.max_iterations,
            },
            quadrature: QuadratureSettings {
                abs_tolerance: self.integration_abs_tolerance,
                rel_tolerance: 0.0,
                limit: self.integration_limit,
            },
            lai_max: self.lai_max,
            empirical_bracket_factor: self.empirical_bracket_factor,
            analytic_bracket_factor: self.analytic_bracket_factor,
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LaiPathError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_solver_defaults() {
        let config = Config::default();
        assert_eq!(config.solver_settings(), SolverSettings::default());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str("bin_count = 40\ncorrect_near_zero_paths = false\n").unwrap();
        assert_eq!(config.bin_count, 40);
        assert!(!config.correct_near_zero_paths);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.lai_max, LAI_MAX);
        assert!(config.output_path.is_none());
    }

    #[test]
    fn round_trips_through_file() {
        let path = std::env::temp_dir().join(format!("lai_path_config_{}.toml", std::process::id()));
        let mut config = Config::default();
        config.bin_count = 12;
        config.output_path = Some("out".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.bin_count, 12);
        assert_eq!(loaded.output_path.as_deref(), Some("out"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = Config::default();
        config.input_path = std::env::temp_dir().display().to_string();
        assert!(config.validate().is_ok());

        config.bin_count = 0;
        assert!(config.validate().is_err());
        config.bin_count = 25;

        config.root_tolerance = 0.0;
        assert!(config.validate().is_err());
        config.root_rel_tolerance = 1e-6;
        assert!(config.validate().is_ok());

        config.analytic_bracket_factor = 1.0;
        assert!(config.validate().is_err());

        config.input_path = "/definitely/not/here".to_string();
        assert!(matches!(config.validate(), Err(LaiPathError::InvalidPath(_))));
    }
}
