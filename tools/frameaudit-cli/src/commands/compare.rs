//! Compare consecutive analyzed frames of a summary.

use std::path::PathBuf;

use anyhow::Context;
use frameaudit_processing_core::ComparisonEngine;

pub fn run(
    summary_path: PathBuf,
    frame1: u64,
    frame2: u64,
    output: PathBuf,
) -> anyhow::Result<()> {
    println!(
        "Comparing frames {frame1}..={frame2} of {}",
        summary_path.display()
    );

    let summary = super::load_summary(&summary_path)?;
    let report = ComparisonEngine::new()
        .compare(&summary, frame1, frame2)
        .context("Comparison failed")?;

    report
        .save(&output)
        .with_context(|| format!("Failed to write report {}", output.display()))?;

    println!("  {} pair(s) compared", report.total_comparisons);
    for pair in &report.pairwise_comparisons {
        let analyzers: Vec<&str> = pair.results.keys().map(String::as_str).collect();
        println!(
            "    {:>6} -> {:<6} {}",
            pair.frame1,
            pair.frame2,
            if analyzers.is_empty() {
                "(no common analyzers)".to_string()
            } else {
                analyzers.join(", ")
            }
        );
    }
    println!("  Report saved to: {}", output.display());

    Ok(())
}
