//! JSON persistence helpers shared by every artifact.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors that can occur when reading or writing artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ModelError {
    /// Path of the artifact the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::IoError { path, .. } | Self::ParseError { path, .. } => path,
        }
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Pretty-print `value` to `path` atomically: the JSON is written to a
/// sibling temporary file which is then renamed over the target, so a
/// reader never observes a half-written artifact.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ModelError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| ModelError::IoError {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let temp_path = parent.join(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    std::fs::write(&temp_path, json).map_err(|e| ModelError::IoError {
        path: temp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        std::fs::remove_file(&temp_path).ok();
        ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Read and parse a JSON artifact.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let content = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ModelError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}
