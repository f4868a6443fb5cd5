//! Aggregate manifest of a batch run.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::io::{read_json, write_json_atomic, ModelError};

/// Manifest entry for one successfully processed video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path of the video's summary file.
    pub summary_path: String,
    /// Sampled frames that were read and dispatched to the analyzers.
    pub frame_count: u64,
    /// Analyzer names present in the summary.
    pub models: Vec<String>,
}

/// Maps `"<subject>/<video-filename>"` to its [`ManifestEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: IndexMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifest key for a video.
    pub fn key(subject: &str, video_file_name: &str) -> String {
        format!("{subject}/{video_file_name}")
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        read_json(path.as_ref())
    }

    /// Write the manifest atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        write_json_atomic(path.as_ref(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_json_shape() {
        let mut manifest = Manifest::new();
        manifest.insert(
            Manifest::key("student_01", "exam.mp4"),
            ManifestEntry {
                summary_path: "out/student_01/exam/exam_summary.json".to_string(),
                frame_count: 36,
                models: vec!["gaze".to_string(), "phone".to_string()],
            },
        );
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(
            json,
            r#"{"student_01/exam.mp4":{"summary_path":"out/student_01/exam/exam_summary.json","frame_count":36,"models":["gaze","phone"]}}"#
        );
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
    }
}
