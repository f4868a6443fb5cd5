//! Per-video summaries: one ordered time series per analyzer.
//!
//! On disk a summary is a JSON object mapping analyzer name to an array of
//! `{frame, timestamp, meta}` records:
//!
//! ```json
//! { "gaze": [ { "frame": 0, "timestamp": 0.0, "meta": { "gaze_away": false, "gaze_angle": 2.5 } } ] }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::io::{read_json, write_json_atomic, ModelError};
use crate::value::MetaValue;

/// One analyzer's result for one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Zero-based frame index in the source video.
    #[serde(rename = "frame")]
    pub frame_index: u64,

    /// `frame_index / frame_rate`, in seconds.
    #[serde(rename = "timestamp", default)]
    pub timestamp_secs: f64,

    /// Normalized analyzer metadata.
    pub meta: MetaValue,
}

impl FrameRecord {
    pub fn new(frame_index: u64, frame_rate: f64, meta: MetaValue) -> Self {
        let timestamp_secs = if frame_rate > 0.0 {
            frame_index as f64 / frame_rate
        } else {
            0.0
        };
        Self {
            frame_index,
            timestamp_secs,
            meta,
        }
    }
}

/// A record was appended at or before the last frame of its series.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("series {analyzer}: frame {frame} does not follow frame {previous}")]
pub struct OrderViolation {
    pub analyzer: String,
    pub previous: u64,
    pub frame: u64,
}

/// The complete set of per-analyzer time series for one video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoSummary {
    series: IndexMap<String, Vec<FrameRecord>>,
}

impl VideoSummary {
    /// An empty summary with one (empty) series per analyzer, in order.
    pub fn with_analyzers<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            series: names.into_iter().map(|n| (n.into(), Vec::new())).collect(),
        }
    }

    /// Append a record to an analyzer's series. Frame indices within a
    /// series must be strictly increasing.
    pub fn append(&mut self, analyzer: &str, record: FrameRecord) -> Result<(), OrderViolation> {
        let series = self.series.entry(analyzer.to_string()).or_default();
        if let Some(last) = series.last() {
            if record.frame_index <= last.frame_index {
                return Err(OrderViolation {
                    analyzer: analyzer.to_string(),
                    previous: last.frame_index,
                    frame: record.frame_index,
                });
            }
        }
        series.push(record);
        Ok(())
    }

    /// Analyzer names in summary order.
    pub fn analyzer_names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn series(&self, analyzer: &str) -> Option<&[FrameRecord]> {
        self.series.get(analyzer).map(Vec::as_slice)
    }

    /// Iterate `(analyzer, records)` in summary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FrameRecord])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn analyzer_count(&self) -> usize {
        self.series.len()
    }

    pub fn total_records(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Names of series whose frame indices are not strictly increasing.
    /// Always empty for summaries built through [`VideoSummary::append`].
    pub fn unordered_series(&self) -> Vec<&str> {
        self.series
            .iter()
            .filter(|(_, records)| !is_strictly_increasing(records))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Load a summary file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        read_json(path.as_ref())
    }

    /// Write the summary atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        write_json_atomic(path.as_ref(), self)
    }
}

/// Whether frame indices in `records` are unique and ascending.
pub fn is_strictly_increasing(records: &[FrameRecord]) -> bool {
    records
        .windows(2)
        .all(|pair| pair[0].frame_index < pair[1].frame_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(count: i64) -> MetaValue {
        MetaValue::map([("person_count", count)])
    }

    #[test]
    fn test_timestamp_derives_from_frame_rate() {
        let record = FrameRecord::new(45, 30.0, MetaValue::Null);
        assert!((record.timestamp_secs - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_append_rejects_duplicate_and_backwards_frames() {
        let mut summary = VideoSummary::with_analyzers(["persons"]);
        summary.append("persons", FrameRecord::new(5, 25.0, meta(1))).unwrap();

        let dup = summary.append("persons", FrameRecord::new(5, 25.0, meta(2)));
        assert_eq!(
            dup,
            Err(OrderViolation {
                analyzer: "persons".to_string(),
                previous: 5,
                frame: 5,
            })
        );
        assert!(summary
            .append("persons", FrameRecord::new(0, 25.0, meta(2)))
            .is_err());
        assert_eq!(summary.series("persons").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_series_are_kept_in_order() {
        let summary = VideoSummary::with_analyzers(["identity", "gaze", "phone"]);
        let names: Vec<&str> = summary.analyzer_names().collect();
        assert_eq!(names, ["identity", "gaze", "phone"]);
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"identity":[],"gaze":[],"phone":[]}"#);
    }

    #[test]
    fn test_json_shape() {
        let mut summary = VideoSummary::with_analyzers(["persons"]);
        summary.append("persons", FrameRecord::new(10, 5.0, meta(2))).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            json,
            r#"{"persons":[{"frame":10,"timestamp":2.0,"meta":{"person_count":2}}]}"#
        );
    }

    #[test]
    fn test_unordered_series_detected_on_loaded_data() {
        let raw = r#"{
            "gaze": [{"frame": 5, "timestamp": 0.2, "meta": {}}, {"frame": 0, "timestamp": 0.0, "meta": {}}],
            "phone": [{"frame": 0, "meta": {"phone_count": 0}}]
        }"#;
        let summary: VideoSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(summary.unordered_series(), ["gaze"]);
        assert_eq!(summary.series("phone").unwrap()[0].timestamp_secs, 0.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join("frameaudit_test_summary_save");
        let _ = std::fs::remove_dir_all(&dir);

        let mut summary = VideoSummary::with_analyzers(["identity"]);
        summary
            .append(
                "identity",
                FrameRecord::new(
                    0,
                    30.0,
                    MetaValue::map([
                        ("is_match", MetaValue::Bool(false)),
                        ("distance", MetaValue::Float(f64::INFINITY)),
                    ]),
                ),
            )
            .unwrap();

        let path = dir.join("clip_summary.json");
        summary.save(&path).unwrap();
        let loaded = VideoSummary::load(&path).unwrap();

        let distance = loaded.series("identity").unwrap()[0]
            .meta
            .get("distance")
            .and_then(MetaValue::as_f64)
            .unwrap();
        assert!(distance.is_infinite());

        std::fs::remove_dir_all(&dir).ok();
    }
}
