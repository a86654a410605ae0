use curb_detector::config::demo::{self, OutputFormat};
use curb_detector::io::{load_points_xyz, save_height_map_png, save_label_map_png, write_json_file};
use curb_detector::{CurbDetector, DetectionReport};
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = demo::load_config(Path::new(&config_path)).map_err(|e| e.to_string())?;

    let points = load_points_xyz(&config.input_path).map_err(|e| e.to_string())?;
    let mut detector = CurbDetector::new(config.pipeline.clone()).map_err(|e| e.to_string())?;
    let report = detector.process(&points).map_err(|e| e.to_string())?;

    if config.output.format.includes_text() {
        print_text_summary(&report);
    }

    if config.output.format.includes_json() {
        if let Some(path) = &config.output.json_out {
            write_json_file(path, &report).map_err(|e| e.to_string())?;
            if !config.output.format.includes_text() {
                println!("JSON report written to {}", path.display());
            } else {
                println!("\nJSON report written to {}", path.display());
            }
        } else {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("Failed to serialize JSON: {e}"))?;
            if config.output.format == OutputFormat::Both {
                println!("\nJSON report:\n{json}");
            } else {
                println!("{json}");
            }
        }
    }

    if let Some(dir) = &config.output.debug_dir {
        save_debug_artifacts(dir, &report).map_err(|e| e.to_string())?;
        if config.output.format.includes_text() {
            println!("Debug artifacts written to {}", dir.display());
        } else {
            eprintln!("Debug artifacts written to {}", dir.display());
        }
    }

    Ok(())
}

fn usage() -> String {
    "Usage: dem_demo <config.json>".to_string()
}

fn print_text_summary(report: &DetectionReport) {
    let s = &report.summary;
    println!("Detection summary");
    println!("  points: {}", s.num_points);
    println!("  valid cells: {}", s.valid_cells);
    println!("  edges: {}", s.edges);
    println!("  regions: {}", s.regions);
    println!("  estimator valid: {}", s.estimator_valid);
    println!("  latency_ms: {:.3}", s.latency_ms);

    let trace = &report.trace;
    if let Some(dem) = &trace.dem {
        println!(
            "\nDEM: {}x{} cells, {} valid, {} points outside, heights={}",
            dem.dims[0],
            dem.dims[1],
            dem.valid_cells,
            dem.outside_points,
            dem.height_range
                .map(|[lo, hi]| format!("[{lo:.3}, {hi:.3}]"))
                .unwrap_or_else(|| "-".to_string())
        );
    }

    if let Some(model) = &report.model {
        println!("\nMixture ({} components)", model.num_components());
        for (k, c) in model.components.iter().enumerate() {
            let coeffs: Vec<String> = c.coefficients.iter().map(|v| format!("{v:.4}")).collect();
            println!(
                "  k={k}: weight={:.3} sigma={:.4} coefficients=[{}]",
                c.weight,
                c.variance.sqrt(),
                coeffs.join(", ")
            );
        }
    }
    if let Some(est) = &trace.estimation {
        println!(
            "  estimator={} observations={} em_iterations={} converged={} log_likelihood={}",
            est.estimator,
            est.observations,
            est.em.iterations,
            est.em.converged,
            format_opt(est.em.final_log_likelihood())
        );
    }

    match &trace.inference {
        Some(bp) => println!(
            "\nLabeling: status={:?} iterations={} max_diff={:.3e} label_counts={:?}",
            bp.status, bp.iterations, bp.max_diff, bp.label_counts
        ),
        None => println!("\nLabeling: skipped (estimator invalid)"),
    }

    let timings: Vec<String> = trace
        .timings
        .stages
        .iter()
        .map(|t| format!("{}={:.3}", t.label, t.elapsed_ms))
        .collect();
    println!(
        "\nTimings (ms): {} total={:.3}",
        timings.join(" "),
        trace.timings.total_ms
    );
}

fn format_opt(val: Option<f64>) -> String {
    val.map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn save_debug_artifacts(dir: &Path, report: &DetectionReport) -> curb_detector::Result<()> {
    std::fs::create_dir_all(dir)?;

    write_json_file(&dir.join("trace.json"), &report.trace)?;
    write_json_file(&dir.join("segmentation.json"), &report.segmentation)?;
    if let Some(model) = &report.model {
        write_json_file(&dir.join("model.json"), model)?;
    }

    save_height_map_png(&report.dem, &dir.join("height_map.png"))?;
    if report.labeling.is_some() {
        save_label_map_png(&report.dem, &dir.join("label_map.png"))?;
    }

    Ok(())
}
