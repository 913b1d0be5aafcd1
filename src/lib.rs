// src/lib.rs - Library interface for the path length LAI estimator

pub mod canopy;
pub mod config;
pub mod correction;
pub mod density;
pub mod errors;
pub mod estimator;
pub mod gap_model;
pub mod measurement_io;
pub mod output;
pub mod pipeline;
pub mod quadrature;
pub mod root_finding;

// Re-export commonly used types and functions
pub use errors::{LaiPathError, Result};
pub use config::Config;
pub use pipeline::{process_measurement, LaiReport};
pub use measurement_io::{load_measurement, parse_measurement, InputMeasurement, Measurement, PathLengthInput};

// Core estimation API
pub use density::{build_density, Density, DEFAULT_BIN_COUNT};
pub use estimator::{
    effective_lai_to_true_lai_circle,
    effective_lai_to_true_lai_circle_with,
    estimate_true_lai,
    estimate_true_lai_circle,
    estimate_true_lai_circle_with,
    estimate_true_lai_with,
    EstimateStatus,
    LaiEstimate,
    SolverSettings,
    LAI_MAX,
};
pub use canopy::{clumping_index, effective_lai, CanopyObservation};
pub use correction::{correct_saturated_estimate, reclassify_near_zero_paths, NearZeroCorrection};
