//! Analyze every video of a dataset.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use frameaudit_analyzers::CommandAnalyzerFactory;
use frameaudit_common::AppConfig;
use frameaudit_pipeline::{AnalyzerRegistry, BatchDriver, BatchOptions};
use frameaudit_video::FfmpegOpener;

pub async fn run(
    dataset_root: PathBuf,
    output_dir: PathBuf,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let analysis = &config.analysis;
    println!("Dataset:  {}", dataset_root.display());
    println!("Output:   {}", output_dir.display());
    println!("Models:   {}", analysis.analyzers.join(", "));
    match analysis.max_seconds {
        Some(secs) => println!(
            "Sampling: every {} frames, first {secs}s",
            analysis.frame_stride
        ),
        None => println!("Sampling: every {} frames, whole video", analysis.frame_stride),
    }

    tracing::info!(
        root = %dataset_root.display(),
        output = %output_dir.display(),
        analyzers = ?analysis.analyzers,
        stride = analysis.frame_stride,
        max_seconds = ?analysis.max_seconds,
        jobs = analysis.jobs,
        "Starting batch run"
    );

    let factory = CommandAnalyzerFactory::from_config(config)
        .context("Failed to configure detector backends")?;

    // Pre-flight: fail before touching any video if nothing can load.
    let preflight = AnalyzerRegistry::build(&analysis.analyzers, &factory)
        .context("Failed to load analyzers")?;
    println!("  Loaded: {}", preflight.names().join(", "));
    drop(preflight);

    let driver = BatchDriver::new(
        Arc::new(FfmpegOpener),
        Arc::new(factory),
        BatchOptions {
            analyzers: analysis.analyzers.clone(),
            frame_stride: analysis.frame_stride,
            max_seconds: analysis.max_seconds,
            save_annotated_frames: analysis.save_annotated_frames,
            jobs: analysis.jobs,
        },
    );
    let report = driver
        .run(&dataset_root, &output_dir)
        .await
        .context("Batch run failed")?;

    println!();
    println!("Processed {} video(s)", report.manifest.len());
    for key in report.manifest.keys() {
        if let Some(entry) = report.manifest.get(key) {
            println!("  [OK]   {key} ({} frames)", entry.frame_count);
        }
    }
    for (key, error) in &report.failed {
        println!("  [FAIL] {key}: {error}");
    }
    if report.item_failures > 0 {
        println!(
            "{} frame/analyzer item(s) failed, see {}",
            report.item_failures,
            output_dir.join(crate::RUN_LOG_FILE).display()
        );
    }
    println!("Manifest: {}", report.manifest_path.display());

    Ok(())
}
