//! Head pose as yaw, pitch and roll.

use frameaudit_processing_core::RawValue;
use frameaudit_summary_model::AnalyzerKind;
use frameaudit_video::RawFrame;

use crate::analyzer::{Analyzer, AnalyzerOutput};
use crate::backend::PoseEstimator;
use crate::draw;
use crate::error::AnalyzerError;

/// Euler angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Converts the estimator's rotation vector to Euler angles.
pub struct HeadPoseAnalyzer {
    estimator: Box<dyn PoseEstimator>,
}

impl HeadPoseAnalyzer {
    pub fn new(estimator: Box<dyn PoseEstimator>) -> Self {
        Self { estimator }
    }
}

impl Analyzer for HeadPoseAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::HeadPose
    }

    fn analyze(&mut self, mut frame: RawFrame) -> Result<AnalyzerOutput, AnalyzerError> {
        let angles = match self.estimator.rotation(&frame)? {
            Some(rvec) => {
                if rvec.iter().any(|v| !v.is_finite()) {
                    return Err(AnalyzerError::malformed(format!(
                        "non-finite rotation vector {rvec:?}"
                    )));
                }
                let angles = euler_from_rotation_vector(rvec);
                draw::status_stripe(&mut frame, 1, draw::BLUE);
                tracing::debug!(
                    yaw = angles.yaw,
                    pitch = angles.pitch,
                    roll = angles.roll,
                    "Head pose"
                );
                angles
            }
            None => {
                tracing::debug!("No face landmarks detected");
                EulerAngles::default()
            }
        };

        let meta = RawValue::map([
            ("yaw", angles.yaw),
            ("pitch", angles.pitch),
            ("roll", angles.roll),
        ]);
        Ok(AnalyzerOutput::new(frame, meta))
    }
}

type Matrix3 = [[f64; 3]; 3];

/// Rodrigues rotation vector to rotation matrix.
fn rotation_matrix(rvec: [f64; 3]) -> Matrix3 {
    let theta = (rvec[0] * rvec[0] + rvec[1] * rvec[1] + rvec[2] * rvec[2]).sqrt();
    if theta < f64::EPSILON {
        return [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    }

    let [x, y, z] = rvec.map(|v| v / theta);
    let (s, c) = theta.sin_cos();
    let t = 1.0 - c;

    [
        [c + t * x * x, t * x * y - s * z, t * x * z + s * y],
        [t * y * x + s * z, c + t * y * y, t * y * z - s * x],
        [t * z * x - s * y, t * z * y + s * x, c + t * z * z],
    ]
}

/// Euler angles (degrees) of a Rodrigues rotation vector.
pub fn euler_from_rotation_vector(rvec: [f64; 3]) -> EulerAngles {
    let r = rotation_matrix(rvec);
    let sy = (r[0][0] * r[0][0] + r[1][0] * r[1][0]).sqrt();
    EulerAngles {
        pitch: r[2][1].atan2(r[2][2]).to_degrees(),
        yaw: (-r[2][0]).atan2(sy).to_degrees(),
        roll: r[1][0].atan2(r[0][0]).to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameaudit_processing_core::normalize;
    use frameaudit_summary_model::MetaValue;
    use proptest::prelude::*;

    struct FixedPose(Option<[f64; 3]>);

    impl PoseEstimator for FixedPose {
        fn rotation(&mut self, _frame: &RawFrame) -> Result<Option<[f64; 3]>, AnalyzerError> {
            Ok(self.0)
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_single_axis_rotations() {
        let quarter = std::f64::consts::FRAC_PI_4;

        let pitch = euler_from_rotation_vector([quarter, 0.0, 0.0]);
        assert!(close(pitch.pitch, 45.0) && close(pitch.yaw, 0.0) && close(pitch.roll, 0.0));

        let yaw = euler_from_rotation_vector([0.0, quarter, 0.0]);
        assert!(close(yaw.yaw, 45.0) && close(yaw.pitch, 0.0) && close(yaw.roll, 0.0));

        let roll = euler_from_rotation_vector([0.0, 0.0, -quarter]);
        assert!(close(roll.roll, -45.0) && close(roll.yaw, 0.0) && close(roll.pitch, 0.0));
    }

    #[test]
    fn test_zero_vector_is_identity() {
        assert_eq!(euler_from_rotation_vector([0.0; 3]), EulerAngles::default());
    }

    #[test]
    fn test_no_face_reports_zero_angles() {
        let mut analyzer = HeadPoseAnalyzer::new(Box::new(FixedPose(None)));
        let out = analyzer.analyze(RawFrame::new(8, 8)).unwrap();
        assert_eq!(
            normalize(out.meta),
            MetaValue::map([("yaw", 0.0), ("pitch", 0.0), ("roll", 0.0)])
        );
    }

    #[test]
    fn test_non_finite_vector_is_malformed() {
        let mut analyzer = HeadPoseAnalyzer::new(Box::new(FixedPose(Some([f64::NAN, 0.0, 0.0]))));
        assert!(matches!(
            analyzer.analyze(RawFrame::new(8, 8)),
            Err(AnalyzerError::MalformedOutput(_))
        ));
    }

    proptest! {
        #[test]
        fn rotation_matrices_are_orthonormal(
            rx in -3.0f64..3.0,
            ry in -3.0f64..3.0,
            rz in -3.0f64..3.0,
        ) {
            let r = rotation_matrix([rx, ry, rz]);
            for i in 0..3 {
                for j in 0..3 {
                    let dot: f64 = (0..3).map(|k| r[i][k] * r[j][k]).sum();
                    let expected = if i == j { 1.0 } else { 0.0 };
                    prop_assert!((dot - expected).abs() < 1e-9);
                }
            }
        }
    }
}
