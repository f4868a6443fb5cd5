//! Phone detection.

use frameaudit_common::ObjectCountModelConfig;
use frameaudit_processing_core::RawValue;
use frameaudit_summary_model::AnalyzerKind;
use frameaudit_video::RawFrame;

use crate::analyzer::{Analyzer, AnalyzerOutput};
use crate::backend::ObjectDetector;
use crate::draw;
use crate::error::AnalyzerError;

/// Counts confident phone detections and outlines each one.
pub struct PhoneAnalyzer {
    detector: Box<dyn ObjectDetector>,
    class_id: u32,
    min_confidence: f64,
}

impl PhoneAnalyzer {
    pub fn new(detector: Box<dyn ObjectDetector>, config: &ObjectCountModelConfig) -> Self {
        Self {
            detector,
            class_id: config.class_id,
            min_confidence: config.min_confidence,
        }
    }
}

impl Analyzer for PhoneAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Phone
    }

    fn analyze(&mut self, mut frame: RawFrame) -> Result<AnalyzerOutput, AnalyzerError> {
        let mut count = 0u64;
        for detection in self.detector.detect(&frame)? {
            if detection.is_confident(self.class_id, self.min_confidence) {
                count += 1;
                draw::box_outline(&mut frame, detection.bbox, draw::ORANGE);
            }
        }

        if count > 0 {
            tracing::warn!(count, "Phone detected");
        } else {
            tracing::debug!("No phone detected");
        }

        Ok(AnalyzerOutput::new(
            frame,
            RawValue::map([("phone_count", RawValue::UInt(count))]),
        ))
    }
}
