//! The frame source capability.

use std::path::Path;

use frameaudit_common::FrameauditResult;

/// A decoded RGB frame.
pub type RawFrame = image::RgbImage;

/// Stream properties known once a video is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub frame_count: u64,
    /// Frames per second. Always positive.
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// Seconds from the start of the video to `index`.
    pub fn timestamp_of(&self, index: u64) -> f64 {
        index as f64 / self.frame_rate
    }

    /// Number of frames in the first `seconds` of the video.
    pub fn frames_in(&self, seconds: f64) -> u64 {
        let bound = (seconds * self.frame_rate).floor();
        if bound <= 0.0 {
            0
        } else {
            bound as u64
        }
    }
}

/// Random-access frame retrieval for one opened video.
pub trait FrameSource: Send {
    fn info(&self) -> &VideoInfo;

    fn frame_count(&self) -> u64 {
        self.info().frame_count
    }

    fn frame_rate(&self) -> f64 {
        self.info().frame_rate
    }

    /// Decode the frame at `index`. Out-of-range or corrupt frames fail
    /// with `FrameRead`; the source stays usable for other indices.
    fn frame_at(&mut self, index: u64) -> FrameauditResult<RawFrame>;
}

/// Opens frame sources for video files.
pub trait VideoOpener: Send + Sync {
    fn open(&self, path: &Path) -> FrameauditResult<Box<dyn FrameSource>>;
}

/// File extensions (lowercase) treated as videos during discovery.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "mkv", "avi"];

/// Whether `path` has a recognized video extension (case-insensitive).
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
