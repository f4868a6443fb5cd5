//! Frame-to-frame comparison reports.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::float::non_finite;
use crate::io::{read_json, write_json_atomic, ModelError};

/// Change in gaze between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeDelta {
    /// Absolute difference in gaze angle (degrees).
    #[serde(with = "non_finite")]
    pub angle_diff: f64,
    /// Whether the gaze-away flag flipped.
    pub flag_changed: bool,
}

/// Change in head pose between two frames (absolute, degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPoseDelta {
    #[serde(with = "non_finite")]
    pub yaw_diff: f64,
    #[serde(with = "non_finite")]
    pub pitch_diff: f64,
    #[serde(with = "non_finite")]
    pub roll_diff: f64,
}

/// Change in identity match between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdentityDelta {
    /// Absolute difference in embedding distance. Infinite when exactly
    /// one side had no face, NaN when neither did.
    #[serde(with = "non_finite")]
    pub distance_diff: f64,
    pub match_changed: bool,
}

/// Signed change in an object count (`current - previous`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountDelta {
    pub count_diff: i64,
}

/// Analyzer-specific delta. Serialized without a tag; the field names
/// identify the shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzerDelta {
    Gaze(GazeDelta),
    HeadPose(HeadPoseDelta),
    Identity(IdentityDelta),
    Count(CountDelta),
}

/// Deltas for one consecutive pair on the alignment axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub frame1: u64,
    pub frame2: u64,
    /// Analyzer name to delta. Only analyzers with a record at both frames
    /// appear; the map may be empty.
    pub results: IndexMap<String, AnalyzerDelta>,
}

/// Result of comparing consecutive frames over an inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub frame_range: [u64; 2],
    pub pairwise_comparisons: Vec<ComparisonPair>,
    pub total_comparisons: usize,
}

impl ComparisonReport {
    pub fn new(start: u64, end: u64, pairs: Vec<ComparisonPair>) -> Self {
        Self {
            frame_range: [start, end],
            total_comparisons: pairs.len(),
            pairwise_comparisons: pairs,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        read_json(path.as_ref())
    }

    /// Write the report atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        write_json_atomic(path.as_ref(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() {
        let mut results = IndexMap::new();
        results.insert(
            "persons".to_string(),
            AnalyzerDelta::Count(CountDelta { count_diff: -1 }),
        );
        let report = ComparisonReport::new(
            0,
            10,
            vec![ComparisonPair {
                frame1: 5,
                frame2: 10,
                results,
            }],
        );
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"frame_range":[0,10],"pairwise_comparisons":[{"frame1":5,"frame2":10,"results":{"persons":{"count_diff":-1}}}],"total_comparisons":1}"#
        );
    }

    #[test]
    fn test_untagged_deltas_parse_back_to_their_shape() {
        let raw = r#"{
            "gaze": {"angle_diff": 35.0, "flag_changed": true},
            "headpose": {"yaw_diff": 1.0, "pitch_diff": 2.0, "roll_diff": 3.0},
            "identity": {"distance_diff": "Infinity", "match_changed": true},
            "phone": {"count_diff": 2}
        }"#;
        let parsed: IndexMap<String, AnalyzerDelta> = serde_json::from_str(raw).unwrap();
        assert!(matches!(parsed["gaze"], AnalyzerDelta::Gaze(_)));
        assert!(matches!(parsed["headpose"], AnalyzerDelta::HeadPose(_)));
        match parsed["identity"] {
            AnalyzerDelta::Identity(d) => assert!(d.distance_diff.is_infinite()),
            other => panic!("unexpected delta: {other:?}"),
        }
        assert_eq!(
            parsed["phone"],
            AnalyzerDelta::Count(CountDelta { count_diff: 2 })
        );
    }

    #[test]
    fn test_empty_results_map_is_serialized() {
        let pair = ComparisonPair {
            frame1: 0,
            frame2: 5,
            results: IndexMap::new(),
        };
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"frame1":0,"frame2":5,"results":{}}"#);
    }
}
