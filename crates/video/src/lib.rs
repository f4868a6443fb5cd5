//! frameaudit Video
//!
//! Random access to the frames of a recorded video.
//!
//! ```text
//!   video file ──ffprobe──▶ VideoInfo { frame_count, frame_rate, size }
//!              ──ffmpeg───▶ frame_at(index) ──▶ RawFrame (RGB8)
//! ```
//!
//! Decoding itself is delegated to the `ffmpeg`/`ffprobe` binaries. A source
//! that cannot be probed, or that reports zero frames, fails to open with
//! `FrameauditError::Decode`. A single unreadable frame fails only that
//! index with `FrameauditError::FrameRead`.

pub mod ffmpeg;
pub mod memory;
pub mod source;

pub use ffmpeg::{FfmpegFrameSource, FfmpegOpener};
pub use memory::MemoryFrameSource;
pub use source::*;
