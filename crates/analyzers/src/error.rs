//! Analyzer error type.

use std::time::Duration;

/// Failure of a single analyzer load or call.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Detector backend failed: {0}")]
    Backend(String),

    #[error("Detector timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed detector output: {0}")]
    MalformedOutput(String),

    #[error("Cannot load detector: {0}")]
    Load(String),

    #[error("Analyzer panicked: {0}")]
    Panicked(String),
}

impl AnalyzerError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedOutput(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
