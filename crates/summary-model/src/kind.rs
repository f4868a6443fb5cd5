//! The closed set of analyzer variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Analyzer variants known to frameaudit. Each has a fixed metadata
/// vocabulary and a fixed delta shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    /// `gaze_away: bool`, `gaze_angle: f64` (degrees).
    Gaze,
    /// `yaw`, `pitch`, `roll: f64` (degrees).
    #[serde(rename = "headpose")]
    HeadPose,
    /// `is_match: bool`, `distance: f64` (may be infinite).
    Identity,
    /// `person_count: u64`.
    Persons,
    /// `phone_count: u64`.
    Phone,
}

impl AnalyzerKind {
    pub const ALL: [AnalyzerKind; 5] = [
        AnalyzerKind::Gaze,
        AnalyzerKind::HeadPose,
        AnalyzerKind::Identity,
        AnalyzerKind::Persons,
        AnalyzerKind::Phone,
    ];

    /// Name used in summaries, reports and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gaze => "gaze",
            Self::HeadPose => "headpose",
            Self::Identity => "identity",
            Self::Persons => "persons",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The name is not one of the known analyzers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown analyzer: {0}")]
pub struct UnknownAnalyzer(pub String);

impl FromStr for AnalyzerKind {
    type Err = UnknownAnalyzer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownAnalyzer(s.to_string()))
    }
}
