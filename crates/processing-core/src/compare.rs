//! Frame-to-frame comparison of a video summary.
//!
//! The engine restricts every analyzer's series to an inclusive frame range,
//! aligns them on the union of their frame indices, and walks that axis
//! pairwise. An analyzer contributes a delta to a pair only when it has a
//! record at both endpoints; sparse coverage is expected and is not an
//! error.

use std::collections::{BTreeMap, BTreeSet};

use frameaudit_common::{FrameauditError, FrameauditResult};
use frameaudit_summary_model::{
    AnalyzerDelta, AnalyzerKind, ComparisonPair, ComparisonReport, CountDelta, FrameRecord,
    GazeDelta, HeadPoseDelta, IdentityDelta, MetaValue, VideoSummary,
};
use indexmap::IndexMap;

/// Computes typed deltas between consecutive sampled frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonEngine;

/// One analyzer's records inside the requested range, keyed by frame.
struct RangeSeries<'a> {
    name: &'a str,
    kind: AnalyzerKind,
    by_frame: BTreeMap<u64, &'a MetaValue>,
}

impl ComparisonEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compare consecutive frames of `summary` within `[start, end]`.
    ///
    /// Pairs are emitted for every consecutive pair on the alignment axis,
    /// even when no analyzer has data at both ends.
    pub fn compare(
        &self,
        summary: &VideoSummary,
        start: u64,
        end: u64,
    ) -> FrameauditResult<ComparisonReport> {
        if start > end {
            return Err(FrameauditError::InvalidRange { start, end });
        }

        let mut axis = BTreeSet::new();
        let mut series = Vec::with_capacity(summary.analyzer_count());

        for (name, records) in summary.iter() {
            let in_range = records
                .iter()
                .filter(|r| (start..=end).contains(&r.frame_index));
            let by_frame = first_per_frame(in_range);
            axis.extend(by_frame.keys().copied());

            match name.parse::<AnalyzerKind>() {
                Ok(kind) => series.push(RangeSeries {
                    name,
                    kind,
                    by_frame,
                }),
                Err(_) => {
                    tracing::warn!(analyzer = name, "No delta defined for analyzer, skipping");
                }
            }
        }

        let axis: Vec<u64> = axis.into_iter().collect();
        let pairs: Vec<ComparisonPair> = axis
            .windows(2)
            .map(|w| compare_pair(&series, w[0], w[1]))
            .collect();

        tracing::debug!(
            start,
            end,
            axis_len = axis.len(),
            pairs = pairs.len(),
            "Compared frame range"
        );

        Ok(ComparisonReport::new(start, end, pairs))
    }
}

/// Index records by frame. A repeated frame keeps its first record.
fn first_per_frame<'a>(
    records: impl Iterator<Item = &'a FrameRecord>,
) -> BTreeMap<u64, &'a MetaValue> {
    let mut by_frame = BTreeMap::new();
    for record in records {
        by_frame.entry(record.frame_index).or_insert(&record.meta);
    }
    by_frame
}

fn compare_pair(series: &[RangeSeries<'_>], frame1: u64, frame2: u64) -> ComparisonPair {
    let mut results = IndexMap::new();

    for s in series {
        let (Some(prev), Some(curr)) = (s.by_frame.get(&frame1), s.by_frame.get(&frame2)) else {
            continue;
        };
        // Empty results carry nothing to compare.
        if prev.is_empty() || curr.is_empty() {
            continue;
        }
        match delta(s.kind, prev, curr) {
            Some(d) => {
                results.insert(s.name.to_string(), d);
            }
            None => {
                tracing::warn!(
                    analyzer = s.name,
                    frame1,
                    frame2,
                    "Record is missing delta fields, skipping"
                );
            }
        }
    }

    ComparisonPair {
        frame1,
        frame2,
        results,
    }
}

/// Typed delta for one analyzer, or `None` when a field is missing or has
/// the wrong type.
fn delta(kind: AnalyzerKind, prev: &MetaValue, curr: &MetaValue) -> Option<AnalyzerDelta> {
    let d = match kind {
        AnalyzerKind::Gaze => AnalyzerDelta::Gaze(GazeDelta {
            angle_diff: abs_diff(prev, curr, "gaze_angle")?,
            flag_changed: flag(prev, "gaze_away")? != flag(curr, "gaze_away")?,
        }),
        AnalyzerKind::HeadPose => AnalyzerDelta::HeadPose(HeadPoseDelta {
            yaw_diff: abs_diff(prev, curr, "yaw")?,
            pitch_diff: abs_diff(prev, curr, "pitch")?,
            roll_diff: abs_diff(prev, curr, "roll")?,
        }),
        AnalyzerKind::Identity => AnalyzerDelta::Identity(IdentityDelta {
            distance_diff: abs_diff(prev, curr, "distance")?,
            match_changed: flag(prev, "is_match")? != flag(curr, "is_match")?,
        }),
        AnalyzerKind::Persons => AnalyzerDelta::Count(CountDelta {
            count_diff: count_diff(prev, curr, "person_count")?,
        }),
        AnalyzerKind::Phone => AnalyzerDelta::Count(CountDelta {
            count_diff: count_diff(prev, curr, "phone_count")?,
        }),
    };
    Some(d)
}

fn abs_diff(prev: &MetaValue, curr: &MetaValue, key: &str) -> Option<f64> {
    let a = prev.get(key)?.as_f64()?;
    let b = curr.get(key)?.as_f64()?;
    Some((b - a).abs())
}

fn flag(meta: &MetaValue, key: &str) -> Option<bool> {
    meta.get(key)?.as_bool()
}

fn count_diff(prev: &MetaValue, curr: &MetaValue, key: &str) -> Option<i64> {
    let a = prev.get(key)?.as_i64()?;
    let b = curr.get(key)?.as_i64()?;
    Some(b.saturating_sub(a))
}
