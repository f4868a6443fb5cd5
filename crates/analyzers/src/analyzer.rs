//! The analyzer capability.

use frameaudit_processing_core::RawValue;
use frameaudit_summary_model::AnalyzerKind;
use frameaudit_video::RawFrame;

use crate::error::AnalyzerError;

/// Result of analyzing one frame.
#[derive(Debug)]
pub struct AnalyzerOutput {
    /// The analyzer's copy of the frame, possibly with overlays drawn.
    pub frame: RawFrame,
    /// Metadata, normalized by the pipeline before it is stored.
    pub meta: RawValue,
}

impl AnalyzerOutput {
    pub fn new(frame: RawFrame, meta: impl Into<RawValue>) -> Self {
        Self {
            frame,
            meta: meta.into(),
        }
    }
}

/// A per-frame detector.
///
/// The frame passed to [`Analyzer::analyze`] is owned by the call, so
/// drawing on it never affects other analyzers.
pub trait Analyzer: Send {
    fn kind(&self) -> AnalyzerKind;

    /// Name used for series keys and log fields.
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn analyze(&mut self, frame: RawFrame) -> Result<AnalyzerOutput, AnalyzerError>;

    /// Clear any state carried between frames. Called at the start of
    /// every video.
    fn reset(&mut self) {}
}
