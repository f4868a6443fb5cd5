//! Error types shared across frameaudit crates.
//!
//! Per-item failures (`FrameRead`, `AnalyzerLoad`, `AnalyzerRun`) are
//! recoverable and degrade to missing data. `NoAnalyzersLoaded` and
//! `NoFramesProcessed` abort one video. `DatasetRoot` and `SummaryParse`
//! abort a whole run.

use std::path::PathBuf;

/// Top-level error type for frameaudit operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameauditError {
    #[error("Cannot decode video {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Cannot read frame {index}: {message}")]
    FrameRead { index: u64, message: String },

    #[error("Failed to load analyzer {name}: {message}")]
    AnalyzerLoad { name: String, message: String },

    #[error("[{analyzer}] failed on frame {frame}: {message}")]
    AnalyzerRun {
        frame: u64,
        analyzer: String,
        message: String,
        timed_out: bool,
    },

    #[error("Unknown analyzer: {name}")]
    UnknownAnalyzer { name: String },

    #[error("No analyzers loaded")]
    NoAnalyzersLoaded,

    #[error("No frames processed for {path}")]
    NoFramesProcessed { path: PathBuf },

    #[error("Cannot parse summary {path}: {message}")]
    SummaryParse { path: PathBuf, message: String },

    #[error("Dataset root not found: {path}")]
    DatasetRoot { path: PathBuf },

    #[error("Invalid frame range: {start} > {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FrameauditError.
pub type FrameauditResult<T> = Result<T, FrameauditError>;

impl FrameauditError {
    pub fn decode(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn frame_read(index: u64, msg: impl Into<String>) -> Self {
        Self::FrameRead {
            index,
            message: msg.into(),
        }
    }

    pub fn analyzer_load(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AnalyzerLoad {
            name: name.into(),
            message: msg.into(),
        }
    }

    pub fn analyzer_run(
        frame: u64,
        analyzer: impl Into<String>,
        msg: impl Into<String>,
        timed_out: bool,
    ) -> Self {
        Self::AnalyzerRun {
            frame,
            analyzer: analyzer.into(),
            message: msg.into(),
            timed_out,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error only invalidates a single (frame, analyzer) item.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            Self::FrameRead { .. } | Self::AnalyzerLoad { .. } | Self::AnalyzerRun { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_run_message_names_frame_and_analyzer() {
        let err = FrameauditError::analyzer_run(10, "gaze", "boom", false);
        assert_eq!(err.to_string(), "[gaze] failed on frame 10: boom");
    }

    #[test]
    fn test_item_scoped_classification() {
        assert!(FrameauditError::frame_read(3, "eof").is_item_scoped());
        assert!(FrameauditError::analyzer_load("phone", "missing").is_item_scoped());
        assert!(!FrameauditError::NoAnalyzersLoaded.is_item_scoped());
        assert!(!FrameauditError::NoFramesProcessed {
            path: PathBuf::from("a.mp4")
        }
        .is_item_scoped());
    }
}
