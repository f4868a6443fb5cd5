//! Gaze direction from the eye line.

use frameaudit_processing_core::RawValue;
use frameaudit_summary_model::AnalyzerKind;
use frameaudit_video::RawFrame;

use crate::analyzer::{Analyzer, AnalyzerOutput};
use crate::backend::FaceLandmarker;
use crate::draw;
use crate::error::AnalyzerError;

/// Face mesh index of the outer corner of the left eye.
pub const LEFT_EYE_OUTER: usize = 33;
/// Face mesh index of the outer corner of the right eye.
pub const RIGHT_EYE_OUTER: usize = 263;

/// Flags frames where the eye line tilts past a threshold.
pub struct GazeAnalyzer {
    landmarker: Box<dyn FaceLandmarker>,
    away_angle_deg: f64,
}

impl GazeAnalyzer {
    pub fn new(landmarker: Box<dyn FaceLandmarker>, away_angle_deg: f64) -> Self {
        Self {
            landmarker,
            away_angle_deg,
        }
    }
}

impl Analyzer for GazeAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Gaze
    }

    fn analyze(&mut self, mut frame: RawFrame) -> Result<AnalyzerOutput, AnalyzerError> {
        let faces = self.landmarker.landmarks(&frame)?;
        let Some(face) = faces.first() else {
            tracing::debug!("No face landmarks detected");
            return Ok(AnalyzerOutput::new(frame, gaze_meta(false, 0.0)));
        };

        let (Some(left), Some(right)) = (
            face.landmarks.get(LEFT_EYE_OUTER),
            face.landmarks.get(RIGHT_EYE_OUTER),
        ) else {
            return Err(AnalyzerError::malformed(format!(
                "face mesh has {} landmarks, need {}",
                face.landmarks.len(),
                RIGHT_EYE_OUTER + 1
            )));
        };

        let (width, height) = frame.dimensions();
        let left = to_pixel(*left, width, height);
        let right = to_pixel(*right, width, height);
        let angle = eye_line_angle(left, right);
        let away = angle.abs() > self.away_angle_deg;

        let color = if away { draw::RED } else { draw::GREEN };
        draw::thick_line(
            &mut frame,
            (left.0 as f32, left.1 as f32),
            (right.0 as f32, right.1 as f32),
            color,
        );
        draw::status_stripe(&mut frame, 0, color);

        tracing::debug!(angle, away, "Gaze detected");
        Ok(AnalyzerOutput::new(frame, gaze_meta(away, angle)))
    }
}

fn gaze_meta(away: bool, angle: f64) -> RawValue {
    RawValue::map([
        ("gaze_away", RawValue::Bool(away)),
        ("gaze_angle", RawValue::Float(angle)),
    ])
}

/// Landmark to whole pixel coordinates (truncated toward zero).
fn to_pixel(point: [f64; 2], width: u32, height: u32) -> (i64, i64) {
    (
        (point[0] * f64::from(width)) as i64,
        (point[1] * f64::from(height)) as i64,
    )
}

/// Angle of the line from `left` to `right`, in degrees.
fn eye_line_angle(left: (i64, i64), right: (i64, i64)) -> f64 {
    let dx = (right.0 - left.0) as f64;
    let dy = (right.1 - left.1) as f64;
    dy.atan2(dx).to_degrees()
}
