use std::fs;
use std::path::PathBuf;

use lai_path_lib::config::Config;
use lai_path_lib::measurement_io::{get_txt_files_in_dir, load_measurement};
use lai_path_lib::pipeline::process_file;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lai_path_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

const SAMPLES: &str = "0.35\tgap fraction inside canopy\n\
0.05\tgap fraction of large gaps\n\
0\tzenith\n\
0.5\tG\n\
-1\tmode\n\
0.8\n1.6\n2.3\n0.4\n3.1\n2.7\n1.2\n0.9\n2.0\n1.4\n";

const ELLIPSE: &str = "0.30\n0.10\n0\n0.5\n0\n";

#[test]
fn single_file_writes_report_and_histogram() {
    let dir = scratch_dir("single");
    let input_path = dir.join("plot_a.txt");
    fs::write(&input_path, SAMPLES).unwrap();

    let config = Config::default();
    let input = load_measurement(&input_path).unwrap();
    assert_eq!(input.filename, "plot_a");
    let report = process_file(input, None, false, &config).unwrap();

    let report_text = fs::read_to_string(dir.join("plot_a_out.txt")).unwrap();
    assert!(report_text.starts_with("Path Length Distribution Method"));
    assert!(report_text.contains(&format!("LAI_PATH = {:.2}", report.lai_path)));

    let histogram = fs::read_to_string(dir.join("plot_a_histogram.csv")).unwrap();
    let mut lines = histogram.lines();
    assert_eq!(lines.next(), Some("Min,Max,Probability"));
    assert_eq!(lines.count(), config.bin_count);

    assert!(!dir.join("plot_a_summary.json").exists());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn batch_run_appends_summary_rows() {
    let dir = scratch_dir("batch");
    let out_dir = dir.join("reports");
    fs::create_dir_all(&out_dir).unwrap();
    fs::write(dir.join("a_samples.txt"), SAMPLES).unwrap();
    fs::write(dir.join("b_ellipse.txt"), ELLIPSE).unwrap();
    // Earlier report, must be skipped
    fs::write(dir.join("old_out.txt"), "not a measurement").unwrap();

    let mut config = Config::default();
    config.write_json_summary = true;

    let files = get_txt_files_in_dir(&dir).unwrap();
    assert_eq!(files.len(), 2);
    for path in &files {
        let input = load_measurement(path).unwrap();
        process_file(input, Some(&out_dir), true, &config).unwrap();
    }

    assert!(out_dir.join("a_samples_out.txt").exists());
    assert!(out_dir.join("b_ellipse_out.txt").exists());
    assert!(out_dir.join("a_samples_histogram.csv").exists());
    assert!(!out_dir.join("b_ellipse_histogram.csv").exists());

    let json = fs::read_to_string(out_dir.join("b_ellipse_summary.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["estimate"]["status"]["status"], "converged");
    assert!(value["density"].is_null());

    let summary = fs::read_to_string(out_dir.join("summary.csv")).unwrap();
    let rows: Vec<&str> = summary.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("ID,Mode,"));
    assert!(rows[1].starts_with("a_samples,"));
    assert!(rows[2].starts_with("b_ellipse,"));

    let _ = fs::remove_dir_all(&dir);
}
