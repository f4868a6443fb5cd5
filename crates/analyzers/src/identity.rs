//! Identity matching against the first face seen in a video.
//!
//! The analyzer enrolls the first face it detects as the reference and
//! compares every later face to it:
//!
//! ```text
//!   Unset ──first face──▶ Enrolled ──next face──▶ Active
//!     ▲                                              │
//!     └────────────────── reset() ◀──────────────────┘
//! ```
//!
//! Enrollment is never revised within a video. `reset()` runs at the start
//! of each video so a reference never carries over.

use frameaudit_processing_core::RawValue;
use frameaudit_summary_model::AnalyzerKind;
use frameaudit_video::RawFrame;

use crate::analyzer::{Analyzer, AnalyzerOutput};
use crate::backend::FaceEmbedder;
use crate::draw;
use crate::error::AnalyzerError;

/// Enrollment lifecycle of the reference embedding.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Enrollment {
    #[default]
    Unset,
    /// Reference taken, no comparison made yet.
    Enrolled(Vec<f64>),
    /// At least one later face has been compared.
    Active(Vec<f64>),
}

impl Enrollment {
    pub fn reference(&self) -> Option<&[f64]> {
        match self {
            Self::Unset => None,
            Self::Enrolled(r) | Self::Active(r) => Some(r),
        }
    }
}

pub struct IdentityAnalyzer {
    embedder: Box<dyn FaceEmbedder>,
    match_threshold: f64,
    enrollment: Enrollment,
}

impl IdentityAnalyzer {
    pub fn new(embedder: Box<dyn FaceEmbedder>, match_threshold: f64) -> Self {
        Self {
            embedder,
            match_threshold,
            enrollment: Enrollment::Unset,
        }
    }

    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }
}

impl Analyzer for IdentityAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Identity
    }

    fn analyze(&mut self, mut frame: RawFrame) -> Result<AnalyzerOutput, AnalyzerError> {
        let faces = self.embedder.embed(&frame)?;
        let Some(current) = faces.into_iter().next().map(|f| f.embedding) else {
            if self.enrollment == Enrollment::Unset {
                tracing::warn!("No face detected in enrollment frame");
            }
            draw::status_stripe(&mut frame, 2, draw::RED);
            return Ok(AnalyzerOutput::new(frame, identity_meta(false, f64::INFINITY)));
        };
        if current.is_empty() {
            return Err(AnalyzerError::malformed("empty face embedding"));
        }

        let (is_match, distance) = match std::mem::take(&mut self.enrollment) {
            Enrollment::Unset => {
                tracing::info!("Identity enrolled");
                self.enrollment = Enrollment::Enrolled(current);
                (true, 0.0)
            }
            Enrollment::Enrolled(reference) | Enrollment::Active(reference) => {
                let compared = l2_distance(&reference, &current);
                self.enrollment = Enrollment::Active(reference);
                let distance = compared?;
                (distance < self.match_threshold, distance)
            }
        };

        let color = if is_match { draw::GREEN } else { draw::RED };
        draw::status_stripe(&mut frame, 2, color);
        Ok(AnalyzerOutput::new(frame, identity_meta(is_match, distance)))
    }

    fn reset(&mut self) {
        self.enrollment = Enrollment::Unset;
    }
}

fn identity_meta(is_match: bool, distance: f64) -> RawValue {
    RawValue::map([
        ("is_match", RawValue::Bool(is_match)),
        ("distance", RawValue::Float(distance)),
    ])
}

fn l2_distance(a: &[f64], b: &[f64]) -> Result<f64, AnalyzerError> {
    if a.len() != b.len() {
        return Err(AnalyzerError::malformed(format!(
            "embedding length {} does not match reference length {}",
            b.len(),
            a.len()
        )));
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt())
}
