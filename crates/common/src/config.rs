//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FrameauditError, FrameauditResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frame sampling and batch defaults.
    pub analysis: AnalysisDefaults,

    /// Detector backend settings, one entry per analyzer.
    pub models: ModelsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default frame sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// Analyzer names to load, in dispatch order.
    pub analyzers: Vec<String>,

    /// Spacing between sampled frame indices.
    pub frame_stride: u64,

    /// Only the first `max_seconds` of each video are analyzed.
    /// `None` analyzes the whole video.
    pub max_seconds: Option<f64>,

    /// Persist one annotated JPEG per (frame, analyzer).
    pub save_annotated_frames: bool,

    /// Deadline for a single analyzer call, in seconds.
    pub call_timeout_secs: f64,

    /// Number of videos processed concurrently.
    pub jobs: usize,
}

/// Detector backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub gaze: GazeModelConfig,
    pub headpose: DetectorCommand,
    pub identity: IdentityModelConfig,
    pub persons: ObjectCountModelConfig,
    pub phone: ObjectCountModelConfig,
}

/// External program invoked once per frame. The frame image path is
/// appended as the last argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectorCommand {
    pub argv: Vec<String>,
}

impl DetectorCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Program name, if any is configured.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeModelConfig {
    pub command: DetectorCommand,
    /// Eye-line angle (degrees) beyond which gaze counts as away.
    pub away_angle_deg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityModelConfig {
    pub command: DetectorCommand,
    /// Embedding distance below which a face matches the enrolled one.
    pub match_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectCountModelConfig {
    pub command: DetectorCommand,
    /// Detector class id that is counted.
    pub class_id: u32,
    /// Detections at or below this confidence are ignored.
    pub min_confidence: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "frameaudit=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// Analyzer names in their default dispatch order.
pub const DEFAULT_ANALYZERS: [&str; 5] = ["identity", "gaze", "headpose", "phone", "persons"];

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            analyzers: DEFAULT_ANALYZERS.iter().map(|s| s.to_string()).collect(),
            frame_stride: 5,
            max_seconds: Some(600.0),
            save_annotated_frames: true,
            call_timeout_secs: 30.0,
            jobs: 1,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            gaze: GazeModelConfig::default(),
            headpose: DetectorCommand::new(["frameaudit-headpose"]),
            identity: IdentityModelConfig::default(),
            persons: ObjectCountModelConfig {
                command: DetectorCommand::new(["frameaudit-yolo"]),
                class_id: 0,
                min_confidence: 0.25,
            },
            phone: ObjectCountModelConfig {
                command: DetectorCommand::new(["frameaudit-yolo"]),
                class_id: 67,
                min_confidence: 0.3,
            },
        }
    }
}

impl Default for GazeModelConfig {
    fn default() -> Self {
        Self {
            command: DetectorCommand::new(["frameaudit-facemesh"]),
            away_angle_deg: 30.0,
        }
    }
}

impl Default for IdentityModelConfig {
    fn default() -> Self {
        Self {
            command: DetectorCommand::new(["frameaudit-faceembed"]),
            match_threshold: 1.0,
        }
    }
}

impl Default for ObjectCountModelConfig {
    fn default() -> Self {
        ModelsConfig::default().persons
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Unlike [`AppConfig::load`], a
    /// missing or malformed file is an error.
    pub fn load_from(path: &Path) -> FrameauditResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FrameauditError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            FrameauditError::config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> FrameauditResult<()> {
        if self.analysis.frame_stride == 0 {
            return Err(FrameauditError::config("frame_stride must be at least 1"));
        }
        if let Some(secs) = self.analysis.max_seconds {
            if !secs.is_finite() || secs < 0.0 {
                return Err(FrameauditError::config(
                    "max_seconds must be a non-negative number",
                ));
            }
        }
        let timeout = self.analysis.call_timeout_secs;
        if timeout.is_nan() || timeout <= 0.0 {
            return Err(FrameauditError::config("call_timeout_secs must be positive"));
        }
        if self.analysis.jobs == 0 {
            return Err(FrameauditError::config("jobs must be at least 1"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("frameaudit").join("config.json")
}
