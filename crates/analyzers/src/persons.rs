//! Person count.

use frameaudit_common::ObjectCountModelConfig;
use frameaudit_processing_core::RawValue;
use frameaudit_summary_model::AnalyzerKind;
use frameaudit_video::RawFrame;

use crate::analyzer::{Analyzer, AnalyzerOutput};
use crate::backend::ObjectDetector;
use crate::draw;
use crate::error::AnalyzerError;

/// Counts confident person detections. More than one is flagged.
pub struct PersonsAnalyzer {
    detector: Box<dyn ObjectDetector>,
    class_id: u32,
    min_confidence: f64,
}

impl PersonsAnalyzer {
    pub fn new(detector: Box<dyn ObjectDetector>, config: &ObjectCountModelConfig) -> Self {
        Self {
            detector,
            class_id: config.class_id,
            min_confidence: config.min_confidence,
        }
    }
}

impl Analyzer for PersonsAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Persons
    }

    fn analyze(&mut self, mut frame: RawFrame) -> Result<AnalyzerOutput, AnalyzerError> {
        let count = self
            .detector
            .detect(&frame)?
            .iter()
            .filter(|d| d.is_confident(self.class_id, self.min_confidence))
            .count() as u64;

        let crowded = count > 1;
        if crowded {
            tracing::warn!(count, "Multiple persons detected");
        } else {
            tracing::debug!(count, "Person count");
        }
        let color = if crowded { draw::RED } else { draw::GREEN };
        draw::status_stripe(&mut frame, 3, color);

        Ok(AnalyzerOutput::new(
            frame,
            RawValue::map([("person_count", RawValue::UInt(count))]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Detection;
    use frameaudit_processing_core::normalize;
    use frameaudit_summary_model::MetaValue;

    struct FixedDetections(Vec<Detection>);

    impl ObjectDetector for FixedDetections {
        fn detect(&mut self, _frame: &RawFrame) -> Result<Vec<Detection>, AnalyzerError> {
            Ok(self.0.clone())
        }
    }

    fn det(class_id: u32, confidence: f64) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox: [0.0, 0.0, 4.0, 4.0],
        }
    }

    #[test]
    fn test_counts_confident_people_only() {
        let detections = vec![det(0, 0.9), det(0, 0.25), det(0, 0.3), det(67, 0.99)];
        let mut analyzer = PersonsAnalyzer::new(
            Box::new(FixedDetections(detections)),
            &ObjectCountModelConfig::default(),
        );

        let out = analyzer.analyze(RawFrame::new(32, 32)).unwrap();
        assert_eq!(
            normalize(out.meta),
            MetaValue::map([("person_count", MetaValue::Int(2))])
        );
        assert_eq!(*out.frame.get_pixel(0, 18), draw::RED);
    }

    #[test]
    fn test_empty_frame_counts_zero() {
        let mut analyzer = PersonsAnalyzer::new(
            Box::new(FixedDetections(Vec::new())),
            &ObjectCountModelConfig::default(),
        );
        let out = analyzer.analyze(RawFrame::new(16, 16)).unwrap();
        assert_eq!(
            normalize(out.meta).get("person_count"),
            Some(&MetaValue::Int(0))
        );
    }
}
