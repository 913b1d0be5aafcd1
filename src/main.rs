use std::path::PathBuf;
use std::time::Instant;
use std::fs;
use clap::Parser;

use lai_path_lib::config::Config;
use lai_path_lib::errors::{LaiPathError, Result};
use lai_path_lib::measurement_io::{get_txt_files_in_dir, load_measurement};
use lai_path_lib::output::render_report;
use lai_path_lib::pipeline::process_file;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "LAI_PATH - Leaf area index from path length distribution")]
struct Args {
    /// Path to measurement file or directory of measurement files
    #[clap(short, long)]
    input: Option<String>,

    /// Report file, or report directory when the input is a directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long)]
    config: Option<String>,

    /// Number of histogram bins for raw path lengths (overwrites config)
    #[clap(short, long)]
    bins: Option<usize>,

    /// Disable reclassifying near-zero path lengths as large gaps
    #[clap(long)]
    no_correction: bool,

    /// Also write a JSON summary next to each report
    #[clap(long)]
    json: bool,

    /// Write the effective configuration to this TOML file and exit
    #[clap(long)]
    save_config: Option<String>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }
    if let Some(output) = args.output.clone() {
        config.output_path = Some(output);
    }
    if let Some(bins) = args.bins {
        config.bin_count = bins;
    }
    if args.no_correction {
        config.correct_near_zero_paths = false;
    }
    if args.json {
        config.write_json_summary = true;
    }

    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        log::info!("Configuration written to {}", path);
        return Ok(());
    }

    config.validate()?;

    let start_time = Instant::now();
    let input_path = PathBuf::from(&config.input_path);
    let output_path = config.output_path.as_ref().map(PathBuf::from);

    if input_path.is_file() {
        log::info!("Processing single file: {}", input_path.display());
        let input = load_measurement(&input_path)?;
        let report = process_file(input, output_path.as_deref(), false, &config)?;
        println!("{}", render_report(&report));
    } else if input_path.is_dir() {
        log::info!("Processing directory: {}", input_path.display());
        let files = get_txt_files_in_dir(&input_path)?;
        log::info!("Found {} measurement files", files.len());

        if let Some(dir) = &output_path {
            fs::create_dir_all(dir)?;
        }

        let mut failed = 0usize;
        for path in &files {
            log::info!("Processing: {}", path.display());
            let result = load_measurement(path)
                .and_then(|input| process_file(input, output_path.as_deref(), true, &config));
            match result {
                Ok(report) => println!(
                    "{}: LAI_PATH = {:.2}",
                    path.display(),
                    report.lai_path
                ),
                Err(e) => {
                    log::error!("Error processing {}: {}", path.display(), e);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            log::warn!("{} of {} files failed", failed, files.len());
        }
    } else {
        return Err(LaiPathError::InvalidPath(input_path));
    }

    let elapsed = start_time.elapsed();
    log::info!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
