pub mod compare;
pub mod inspect;
pub mod run;

use std::path::Path;

use frameaudit_common::FrameauditError;
use frameaudit_summary_model::VideoSummary;

/// Load a summary, reporting any failure as a parse error of that file.
pub fn load_summary(path: &Path) -> Result<VideoSummary, FrameauditError> {
    VideoSummary::load(path).map_err(|e| FrameauditError::SummaryParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
