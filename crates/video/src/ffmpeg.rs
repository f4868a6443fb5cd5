//! ffprobe/ffmpeg-backed frame source.

use std::path::{Path, PathBuf};
use std::process::Command;

use frameaudit_common::process::command_exists;
use frameaudit_common::{FrameauditError, FrameauditResult};
use serde::Deserialize;

use crate::source::{FrameSource, RawFrame, VideoInfo, VideoOpener};

/// Opens videos through the `ffprobe` and `ffmpeg` binaries on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl VideoOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> FrameauditResult<Box<dyn FrameSource>> {
        Ok(Box::new(FfmpegFrameSource::open(path)?))
    }
}

/// A video file decoded one frame at a time by seeking with `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    path: PathBuf,
    info: VideoInfo,
}

impl FfmpegFrameSource {
    /// Probe `path` for its frame count, frame rate and size.
    pub fn open(path: &Path) -> FrameauditResult<Self> {
        if !path.is_file() {
            return Err(FrameauditError::decode(path, "file not found"));
        }
        if !command_exists("ffprobe") || !command_exists("ffmpeg") {
            return Err(FrameauditError::decode(
                path,
                "ffmpeg and ffprobe must be installed",
            ));
        }

        let info = probe(path)?;
        if info.frame_count == 0 {
            return Err(FrameauditError::decode(path, "video has no frames"));
        }

        tracing::debug!(
            path = %path.display(),
            frames = info.frame_count,
            fps = info.frame_rate,
            width = info.width,
            height = info.height,
            "Opened video"
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FfmpegFrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_at(&mut self, index: u64) -> FrameauditResult<RawFrame> {
        if index >= self.info.frame_count {
            return Err(FrameauditError::frame_read(
                index,
                format!("out of range (video has {} frames)", self.info.frame_count),
            ));
        }

        let seek = format!("{:.6}", self.info.timestamp_of(index));
        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &seek, "-i"])
            .arg(&self.path)
            .args([
                "-frames:v",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "pipe:1",
            ])
            .output()
            .map_err(|e| FrameauditError::frame_read(index, format!("failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(FrameauditError::frame_read(
                index,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let VideoInfo { width, height, .. } = self.info;
        let expected = width as usize * height as usize * 3;
        if output.stdout.len() < expected {
            return Err(FrameauditError::frame_read(
                index,
                format!("short read: {} of {expected} bytes", output.stdout.len()),
            ));
        }

        let mut bytes = output.stdout;
        bytes.truncate(expected);
        RawFrame::from_raw(width, height, bytes)
            .ok_or_else(|| FrameauditError::frame_read(index, "frame buffer size mismatch"))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

fn probe(path: &Path) -> FrameauditResult<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames,nb_read_packets",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| FrameauditError::decode(path, format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(FrameauditError::decode(
            path,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| FrameauditError::decode(path, format!("unreadable ffprobe output: {e}")))?;
    parse_probe(parsed).map_err(|msg| FrameauditError::decode(path, msg))
}

fn parse_probe(probe: ProbeOutput) -> Result<VideoInfo, String> {
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let width = stream.width.filter(|w| *w > 0).ok_or("missing width")?;
    let height = stream.height.filter(|h| *h > 0).ok_or("missing height")?;

    let frame_rate = [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|rate| parse_rate(rate))
        .ok_or("missing frame rate")?;

    // Packet counting is exact; the container's nb_frames is a fallback.
    let frame_count = [&stream.nb_read_packets, &stream.nb_frames]
        .into_iter()
        .flatten()
        .find_map(|n| n.trim().parse::<u64>().ok())
        .unwrap_or(0);

    Ok(VideoInfo {
        frame_count,
        frame_rate,
        width,
        height,
    })
}

/// Parse an ffprobe rational such as `30000/1001`.
fn parse_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
