//! Show what a summary contains.

use std::path::PathBuf;

pub fn run(summary_path: PathBuf) -> anyhow::Result<()> {
    let summary = super::load_summary(&summary_path)?;

    println!("Summary: {}", summary_path.display());
    println!("{}", "=".repeat(50));
    println!("  Analyzers: {}", summary.analyzer_count());
    println!("  Records:   {}", summary.total_records());

    for (name, records) in summary.iter() {
        match (records.first(), records.last()) {
            (Some(first), Some(last)) => println!(
                "  {name:<10} {:>6} records, frames {}..={} ({:.2}s..={:.2}s)",
                records.len(),
                first.frame_index,
                last.frame_index,
                first.timestamp_secs,
                last.timestamp_secs
            ),
            _ => println!("  {name:<10} {:>6} records", 0),
        }
    }

    let unordered = summary.unordered_series();
    if !unordered.is_empty() {
        println!();
        println!("[WARN] Series out of frame order: {}", unordered.join(", "));
    }

    Ok(())
}
