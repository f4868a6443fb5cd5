//! frameaudit CLI: batch video analysis and summary auditing.
//!
//! Usage:
//!   frameaudit run --dataset-root DIR --output-dir DIR    Analyze every video of a dataset
//!   frameaudit compare --summary FILE --frame1 N --frame2 M --output FILE
//!   frameaudit inspect --summary FILE                     Show what a summary contains

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use frameaudit_common::config::{AppConfig, LoggingConfig};

mod commands;

/// Log file written next to the outputs of a `run`.
const RUN_LOG_FILE: &str = "frameaudit.log";

#[derive(Parser)]
#[command(
    name = "frameaudit",
    about = "Frame-level behaviour analysis for recorded exam videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/frameaudit/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every video under a dataset root
    Run {
        /// Directory with one subdirectory per subject
        #[arg(long)]
        dataset_root: PathBuf,

        /// Where summaries, frames and the manifest are written
        #[arg(long)]
        output_dir: PathBuf,

        /// Analyzers to run, in dispatch order
        #[arg(long, num_args = 1..)]
        models: Option<Vec<String>>,

        /// Analyze every Nth frame
        #[arg(long)]
        frame_stride: Option<u64>,

        /// Only analyze the first S seconds of each video
        #[arg(long, conflicts_with = "whole_video")]
        max_seconds: Option<f64>,

        /// Analyze each video to the end
        #[arg(long)]
        whole_video: bool,

        /// Do not save annotated frames
        #[arg(long)]
        no_frames: bool,

        /// Videos processed at the same time
        #[arg(long)]
        jobs: Option<usize>,

        /// Log level filter (e.g. "info", "frameaudit_pipeline=debug")
        #[arg(long)]
        log_level: Option<String>,

        /// Deadline for one analyzer call, in seconds
        #[arg(long)]
        timeout_secs: Option<f64>,
    },

    /// Compare consecutive analyzed frames within a range
    Compare {
        /// Summary file produced by `run`
        #[arg(long)]
        summary: PathBuf,

        /// First frame of the range (inclusive)
        #[arg(long)]
        frame1: u64,

        /// Last frame of the range (inclusive)
        #[arg(long)]
        frame2: u64,

        /// Report output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show per-analyzer record counts of a summary
    Inspect {
        /// Summary file produced by `run`
        #[arg(long)]
        summary: PathBuf,
    },
}

/// Logging settings for `cli`. A `run` also logs to a file in its output
/// directory, so its dataset root is checked first to avoid creating
/// outputs for a run that cannot start.
fn logging_config(cli: &Cli, config: &AppConfig) -> anyhow::Result<LoggingConfig> {
    let mut logging = LoggingConfig {
        level: if cli.verbose {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        },
        ..config.logging.clone()
    };
    if let Commands::Run {
        dataset_root,
        output_dir,
        log_level,
        ..
    } = &cli.command
    {
        if !dataset_root.is_dir() {
            anyhow::bail!("Dataset root not found: {}", dataset_root.display());
        }
        if let Some(level) = log_level {
            logging.level = level.clone();
        }
        logging.file = Some(output_dir.join(RUN_LOG_FILE));
    }
    Ok(logging)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    let logging = logging_config(&cli, &config)?;
    frameaudit_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Run {
            dataset_root,
            output_dir,
            models,
            frame_stride,
            max_seconds,
            whole_video,
            no_frames,
            jobs,
            log_level: _,
            timeout_secs,
        } => {
            let mut config = config;
            let analysis = &mut config.analysis;
            if let Some(models) = models {
                analysis.analyzers = models;
            }
            if let Some(stride) = frame_stride {
                analysis.frame_stride = stride;
            }
            if whole_video {
                analysis.max_seconds = None;
            } else if max_seconds.is_some() {
                analysis.max_seconds = max_seconds;
            }
            if no_frames {
                analysis.save_annotated_frames = false;
            }
            if let Some(jobs) = jobs {
                analysis.jobs = jobs;
            }
            if let Some(secs) = timeout_secs {
                analysis.call_timeout_secs = secs;
            }
            config.validate().context("Invalid run options")?;

            commands::run::run(dataset_root, output_dir, &config).await
        }
        Commands::Compare {
            summary,
            frame1,
            frame2,
            output,
        } => commands::compare::run(summary, frame1, frame2, output),
        Commands::Inspect { summary } => commands::inspect::run(summary),
    }
}
