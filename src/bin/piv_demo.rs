use piv_engine::config::piv;
use piv_engine::diagnostics::AnalysisReport;
use piv_engine::image::io::{load_grayscale_image, load_mask_image, write_json_file};
use piv_engine::PivAnalyzer;
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
    let config = piv::load_config(Path::new(&config_path))?;

    let first = load_grayscale_image(&config.image_a)?;
    let second = load_grayscale_image(&config.image_b)?;
    let mask = config
        .mask
        .as_deref()
        .map(load_mask_image)
        .transpose()?;

    let analyzer = PivAnalyzer::new(config.piv_params.clone())
        .with_parallel(config.parallel.to_options());
    let report = analyzer
        .analyze_with_diagnostics(&first, &second, mask.as_ref())
        .map_err(|e| format!("Analysis failed: {e}"))?;

    print_text_summary(&report);

    if let Some(path) = &config.output.json_out {
        if config.output.diagnostics {
            write_json_file(path, &report)?;
        } else {
            write_json_file(path, &report.result)?;
        }
        println!("\nJSON written to {}", path.display());
    }

    Ok(())
}

fn usage() -> String {
    "Usage: piv_demo <config.json>".to_string()
}

fn print_text_summary(report: &AnalysisReport) {
    let trace = &report.trace;
    println!(
        "Input: {}x{} ({} masked pixels)",
        trace.input.width, trace.input.height, trace.input.masked_pixels
    );
    for pass in &trace.passes {
        let mean = pass
            .mean_displacement
            .map(|[u, v]| format!("({u:.3}, {v:.3})"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "Pass {}: {}x{} areas on {}x{} grid, failed={} spurious={} replaced={} mean={} [{:.2} ms]",
            pass.index,
            pass.params.area_x,
            pass.params.area_y,
            pass.nx,
            pass.ny,
            pass.cc_failed + pass.peak_failed,
            pass.spurious,
            pass.replaced,
            mean,
            pass.elapsed_ms
        );
    }
    if let Some(post) = &trace.post_smoothing {
        println!(
            "Post-smoothing: spurious={} replaced={}",
            post.spurious, post.replaced
        );
    }
    let result = &report.result;
    println!(
        "Result: n={} measured={} replaced={} masked={} spurious={} total={:.2} ms",
        result.n,
        result.measured_n(),
        result.replaced_n(),
        result.masked_n,
        result.spurious_n,
        trace.timings.total_ms
    );
}
