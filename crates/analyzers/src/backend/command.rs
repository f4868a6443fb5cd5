//! Detector backend that runs an external program per frame.
//!
//! The frame is written to a temporary PNG whose path is appended to the
//! configured command line. The program must print one JSON document on
//! stdout and exit zero before the deadline; otherwise it is killed and
//! the call fails.

use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use frameaudit_common::process::command_exists;
use frameaudit_common::DetectorCommand;
use frameaudit_video::RawFrame;
use serde::de::DeserializeOwned;

use crate::error::AnalyzerError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Runs `command <frame.png>` and parses its stdout as `T`.
pub struct CommandBackend<T> {
    command: DetectorCommand,
    timeout: Duration,
    scratch_dir: PathBuf,
    _output: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for CommandBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBackend")
            .field("command", &self.command.argv)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<T: DeserializeOwned> CommandBackend<T> {
    /// Check that the program is configured and can be found.
    pub fn load(command: &DetectorCommand, timeout: Duration) -> Result<Self, AnalyzerError> {
        let program = command
            .program()
            .ok_or_else(|| AnalyzerError::load("no detector command configured"))?;
        if !command_exists(program) {
            return Err(AnalyzerError::load(format!(
                "detector program not found: {program}"
            )));
        }
        if timeout.is_zero() {
            return Err(AnalyzerError::load("detector timeout must be positive"));
        }

        Ok(Self {
            command: command.clone(),
            timeout,
            scratch_dir: std::env::temp_dir(),
            _output: PhantomData,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the detector on one frame.
    pub fn run(&self, frame: &RawFrame) -> Result<T, AnalyzerError> {
        let input = ScratchFrame::write(&self.scratch_dir, frame)?;
        let stdout = self.run_program(input.path())?;
        serde_json::from_slice(&stdout).map_err(|e| AnalyzerError::malformed(e.to_string()))
    }

    fn run_program(&self, frame_path: &Path) -> Result<Vec<u8>, AnalyzerError> {
        let program = self
            .command
            .program()
            .ok_or_else(|| AnalyzerError::backend("no detector command configured"))?;

        let mut child = Command::new(program)
            .args(self.command.args())
            .arg(frame_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AnalyzerError::backend(format!("failed to start {program}: {e}")))?;

        // Drain both pipes while waiting so a chatty detector cannot block.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    child.kill().ok();
                    child.wait().ok();
                    tracing::debug!(program, timeout = ?self.timeout, "Killed detector");
                    return Err(AnalyzerError::Timeout(self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    child.kill().ok();
                    return Err(AnalyzerError::backend(format!(
                        "failed to wait for {program}: {e}"
                    )));
                }
            }
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(AnalyzerError::backend(format!(
                "{program} exited with {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    })
}

/// A frame written to disk for the duration of one detector call.
struct ScratchFrame {
    path: PathBuf,
}

impl ScratchFrame {
    fn write(dir: &Path, frame: &RawFrame) -> Result<Self, AnalyzerError> {
        let path = dir.join(format!(
            "frameaudit-{}-{}.png",
            std::process::id(),
            FRAME_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        frame
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| AnalyzerError::backend(format!("cannot write frame image: {e}")))?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFrame {
    fn drop(&mut self) {
        std::fs::remove_file(&self.path).ok();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::backend::{DetectionOutput, ObjectDetector};

    fn sh(script: &str) -> DetectorCommand {
        // `sh -c SCRIPT NAME FRAME`: the frame path arrives as $1.
        DetectorCommand::new(["sh", "-c", script, "detector"])
    }

    fn frame() -> RawFrame {
        RawFrame::from_pixel(4, 4, image::Rgb([10, 20, 30]))
    }

    #[test]
    fn test_parses_stdout() {
        let script = r#"test -f "$1" && echo '{"detections":[{"class_id":0,"confidence":0.9,"bbox":[0,0,2,2]}]}'"#;
        let mut backend =
            CommandBackend::<DetectionOutput>::load(&sh(script), Duration::from_secs(10)).unwrap();

        let detections = backend.detect(&frame()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 0);
    }

    #[test]
    fn test_missing_program_fails_to_load() {
        let err = CommandBackend::<DetectionOutput>::load(
            &DetectorCommand::new(["frameaudit-no-such-detector"]),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Load(_)));

        let err = CommandBackend::<DetectionOutput>::load(
            &DetectorCommand::default(),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Load(_)));
    }

    #[test]
    fn test_slow_detector_times_out() {
        let backend =
            CommandBackend::<DetectionOutput>::load(&sh("sleep 5"), Duration::from_millis(100))
                .unwrap();

        let started = Instant::now();
        let err = backend.run(&frame()).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_failing_and_garbled_detectors() {
        let failing = CommandBackend::<DetectionOutput>::load(
            &sh("echo boom >&2; exit 3"),
            Duration::from_secs(10),
        )
        .unwrap();
        match failing.run(&frame()).unwrap_err() {
            AnalyzerError::Backend(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }

        let garbled =
            CommandBackend::<DetectionOutput>::load(&sh("echo not-json"), Duration::from_secs(10))
                .unwrap();
        assert!(matches!(
            garbled.run(&frame()).unwrap_err(),
            AnalyzerError::MalformedOutput(_)
        ));
    }

    #[test]
    fn test_scratch_frame_is_removed() {
        let dir = std::env::temp_dir().join("frameaudit_test_scratch_frame");
        std::fs::create_dir_all(&dir).unwrap();

        let path = {
            let scratch = ScratchFrame::write(&dir, &frame()).unwrap();
            assert!(scratch.path().is_file());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
