//! In-memory frame source.

use std::collections::BTreeSet;

use frameaudit_common::{FrameauditError, FrameauditResult};
use image::Rgb;

use crate::source::{FrameSource, RawFrame, VideoInfo};

/// Frames held in memory, with optional indices that fail to read.
#[derive(Debug, Clone)]
pub struct MemoryFrameSource {
    info: VideoInfo,
    frames: Vec<RawFrame>,
    unreadable: BTreeSet<u64>,
    reads: Vec<u64>,
}

impl MemoryFrameSource {
    /// A source over explicit frames. All frames must share one size.
    pub fn new(frames: Vec<RawFrame>, frame_rate: f64) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            info: VideoInfo {
                frame_count: frames.len() as u64,
                frame_rate,
                width,
                height,
            },
            frames,
            unreadable: BTreeSet::new(),
            reads: Vec::new(),
        }
    }

    /// `count` frames of one color. Each frame's red channel encodes its
    /// index modulo 256 so tests can tell frames apart.
    pub fn solid(count: u64, frame_rate: f64, width: u32, height: u32) -> Self {
        let frames = (0..count)
            .map(|i| RawFrame::from_pixel(width, height, Rgb([(i % 256) as u8, 64, 128])))
            .collect();
        Self::new(frames, frame_rate)
    }

    /// Make `indices` fail with a read error.
    pub fn with_unreadable(mut self, indices: impl IntoIterator<Item = u64>) -> Self {
        self.unreadable.extend(indices);
        self
    }

    /// Indices requested so far, in call order.
    pub fn reads(&self) -> &[u64] {
        &self.reads
    }
}

impl FrameSource for MemoryFrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_at(&mut self, index: u64) -> FrameauditResult<RawFrame> {
        self.reads.push(index);
        if self.unreadable.contains(&index) {
            return Err(FrameauditError::frame_read(index, "corrupt frame"));
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.frames.get(i))
            .cloned()
            .ok_or_else(|| FrameauditError::frame_read(index, "out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_source_frames_are_distinguishable() {
        let mut source = MemoryFrameSource::solid(3, 25.0, 4, 2);
        assert_eq!(source.frame_count(), 3);
        assert_eq!(source.frame_rate(), 25.0);

        let frame = source.frame_at(2).unwrap();
        assert_eq!(frame.dimensions(), (4, 2));
        assert_eq!(frame.get_pixel(0, 0)[0], 2);
    }

    #[test]
    fn test_unreadable_and_out_of_range_indices_fail() {
        let mut source = MemoryFrameSource::solid(5, 25.0, 2, 2).with_unreadable([1]);

        assert!(matches!(
            source.frame_at(1),
            Err(FrameauditError::FrameRead { index: 1, .. })
        ));
        assert!(matches!(
            source.frame_at(5),
            Err(FrameauditError::FrameRead { index: 5, .. })
        ));
        assert!(source.frame_at(2).is_ok());
        assert_eq!(source.reads(), [1, 5, 2]);
    }
}
