//! Frame sampling and analyzer dispatch for one video.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use frameaudit_analyzers::AnalyzerError;
use frameaudit_common::{FrameauditError, FrameauditResult};
use frameaudit_processing_core::normalize;
use frameaudit_summary_model::{FrameRecord, VideoSummary};
use frameaudit_video::{FrameSource, RawFrame, VideoInfo};

use crate::registry::AnalyzerRegistry;

/// Sampling and output settings for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Spacing between sampled frame indices. Must be at least 1.
    pub frame_stride: u64,
    /// Analyze only the first `max_seconds` of the video. `None` analyzes
    /// the whole video.
    pub max_seconds: Option<f64>,
    /// Directory for annotated frames. `None` disables saving them.
    pub frames_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            frame_stride: 5,
            max_seconds: Some(600.0),
            frames_dir: None,
        }
    }
}

/// Result of running the pipeline over one video.
#[derive(Debug)]
pub struct PipelineOutput {
    pub summary: VideoSummary,
    /// Every frame read failure and analyzer call failure, in the order
    /// they happened.
    pub failures: Vec<FrameauditError>,
    /// Sampled frames that were read and dispatched to the analyzers.
    pub frames_processed: u64,
}

/// Dispatches sampled frames to every analyzer in a registry.
#[derive(Debug, Clone)]
pub struct FrameProcessingPipeline {
    options: PipelineOptions,
}

impl FrameProcessingPipeline {
    pub fn new(options: PipelineOptions) -> FrameauditResult<Self> {
        if options.frame_stride == 0 {
            return Err(FrameauditError::config("frame stride must be at least 1"));
        }
        if let Some(secs) = options.max_seconds {
            if secs.is_nan() || secs < 0.0 {
                return Err(FrameauditError::config(format!(
                    "max seconds must be non-negative, got {secs}"
                )));
            }
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run every analyzer over the sampled frames of `source`.
    ///
    /// `video` names the source in logs and errors. The registry is reset
    /// first so no analyzer state carries over from a previous video.
    pub fn run(
        &self,
        video: &Path,
        source: &mut dyn FrameSource,
        registry: &mut AnalyzerRegistry,
    ) -> FrameauditResult<PipelineOutput> {
        registry.reset();

        let info = *source.info();
        let frames_dir = self.prepare_frames_dir();
        let mut summary = VideoSummary::with_analyzers(registry.names());
        let mut failures = Vec::new();
        let mut frames_processed = 0u64;

        let indices = sample_indices(&info, self.options.frame_stride, self.options.max_seconds);
        tracing::info!(
            video = %video.display(),
            frames = info.frame_count,
            fps = info.frame_rate,
            sampled = indices.len(),
            "Processing video"
        );

        for index in indices {
            let frame = match source.frame_at(index) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(video = %video.display(), frame = index, error = %e, "Skipping frame");
                    failures.push(e);
                    continue;
                }
            };
            frames_processed += 1;

            for analyzer in registry.iter_mut() {
                let name = analyzer.name();
                let input = frame.clone();
                // A panic fails this (frame, analyzer) pair only.
                let result = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(input)))
                    .unwrap_or_else(|payload| {
                        Err(AnalyzerError::Panicked(
                            panic_message(payload.as_ref()).to_string(),
                        ))
                    });
                match result {
                    Ok(output) => {
                        if let Some(dir) = &frames_dir {
                            save_annotated(dir, index, name, &output.frame);
                        }
                        let record =
                            FrameRecord::new(index, info.frame_rate, normalize(output.meta));
                        if let Err(e) = summary.append(name, record) {
                            tracing::error!(error = %e, "Dropping out-of-order record");
                        }
                    }
                    Err(e) => {
                        let err = FrameauditError::analyzer_run(
                            index,
                            name,
                            e.to_string(),
                            e.is_timeout(),
                        );
                        tracing::error!(
                            video = %video.display(),
                            frame = index,
                            analyzer = name,
                            error = %e,
                            "{err}"
                        );
                        failures.push(err);
                    }
                }
            }
        }

        if frames_processed == 0 {
            return Err(FrameauditError::NoFramesProcessed {
                path: video.to_path_buf(),
            });
        }

        tracing::info!(
            video = %video.display(),
            frames_processed,
            records = summary.total_records(),
            failures = failures.len(),
            "Finished video"
        );

        Ok(PipelineOutput {
            summary,
            failures,
            frames_processed,
        })
    }

    fn prepare_frames_dir(&self) -> Option<&Path> {
        let dir = self.options.frames_dir.as_deref()?;
        match std::fs::create_dir_all(dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                tracing::warn!(
                    path = %dir.display(),
                    error = %e,
                    "Cannot create frames directory, annotated frames disabled"
                );
                None
            }
        }
    }
}

/// Frame indices `0, stride, 2*stride, ...` below
/// `min(floor(max_seconds * fps), frame_count)`.
pub fn sample_indices(info: &VideoInfo, stride: u64, max_seconds: Option<f64>) -> Vec<u64> {
    let end = match max_seconds {
        Some(secs) => info.frames_in(secs).min(info.frame_count),
        None => info.frame_count,
    };
    let step = usize::try_from(stride.max(1)).unwrap_or(usize::MAX);
    (0..end).step_by(step).collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Annotated frames are an audit aid; failing to write one is logged and
/// does not affect the record.
fn save_annotated(dir: &Path, index: u64, analyzer: &str, frame: &RawFrame) {
    let path = dir.join(format!("frame_{index:05}_{analyzer}.jpg"));
    if let Err(e) = frame.save_with_format(&path, image::ImageFormat::Jpeg) {
        tracing::warn!(path = %path.display(), error = %e, "Cannot save annotated frame");
    }
}
