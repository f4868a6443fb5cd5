//! Detector backends.
//!
//! Each trait is the single model call an analyzer needs. Backends return
//! raw detector output; thresholds, geometry and drawing stay in the
//! analyzers.

mod command;

pub use command::CommandBackend;

use frameaudit_video::RawFrame;
use serde::Deserialize;

use crate::error::AnalyzerError;

/// Face mesh landmarks for one face, in coordinates normalized to the
/// frame size (`0.0..=1.0`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceLandmarks {
    pub landmarks: Vec<[f64; 2]>,
}

/// Object detection in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f64,
    /// `[x1, y1, x2, y2]`.
    pub bbox: [f64; 4],
}

impl Detection {
    /// Whether this detection is of `class_id` with confidence strictly
    /// above `min_confidence`.
    pub fn is_confident(&self, class_id: u32, min_confidence: f64) -> bool {
        self.class_id == class_id && self.confidence > min_confidence
    }
}

/// Identity embedding for one detected face.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceEmbedding {
    pub embedding: Vec<f64>,
}

/// Faces with landmarks, most prominent first.
pub trait FaceLandmarker: Send {
    fn landmarks(&mut self, frame: &RawFrame) -> Result<Vec<FaceLandmarks>, AnalyzerError>;
}

/// Head rotation as a Rodrigues vector, `None` when no face is found.
pub trait PoseEstimator: Send {
    fn rotation(&mut self, frame: &RawFrame) -> Result<Option<[f64; 3]>, AnalyzerError>;
}

/// All object detections in a frame.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<Detection>, AnalyzerError>;
}

/// Face embeddings, most prominent face first.
pub trait FaceEmbedder: Send {
    fn embed(&mut self, frame: &RawFrame) -> Result<Vec<FaceEmbedding>, AnalyzerError>;
}

/// `{"faces": [{"landmarks": [[x, y], ...]}]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaceMeshOutput {
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

/// `{"rotation_vector": [rx, ry, rz]}` or `{"rotation_vector": null}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadPoseOutput {
    #[serde(default)]
    pub rotation_vector: Option<[f64; 3]>,
}

/// `{"detections": [{"class_id": 0, "confidence": 0.9, "bbox": [x1, y1, x2, y2]}]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionOutput {
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// `{"faces": [{"embedding": [...]}]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingOutput {
    #[serde(default)]
    pub faces: Vec<FaceEmbedding>,
}

impl FaceLandmarker for CommandBackend<FaceMeshOutput> {
    fn landmarks(&mut self, frame: &RawFrame) -> Result<Vec<FaceLandmarks>, AnalyzerError> {
        Ok(self.run(frame)?.faces)
    }
}

impl PoseEstimator for CommandBackend<HeadPoseOutput> {
    fn rotation(&mut self, frame: &RawFrame) -> Result<Option<[f64; 3]>, AnalyzerError> {
        Ok(self.run(frame)?.rotation_vector)
    }
}

impl ObjectDetector for CommandBackend<DetectionOutput> {
    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<Detection>, AnalyzerError> {
        Ok(self.run(frame)?.detections)
    }
}

impl FaceEmbedder for CommandBackend<EmbeddingOutput> {
    fn embed(&mut self, frame: &RawFrame) -> Result<Vec<FaceEmbedding>, AnalyzerError> {
        Ok(self.run(frame)?.faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_envelopes_parse() {
        let mesh: FaceMeshOutput =
            serde_json::from_str(r#"{"faces":[{"landmarks":[[0.25,0.5],[0.75,0.5]]}]}"#).unwrap();
        assert_eq!(mesh.faces[0].landmarks[1], [0.75, 0.5]);

        let pose: HeadPoseOutput = serde_json::from_str(r#"{"rotation_vector":null}"#).unwrap();
        assert!(pose.rotation_vector.is_none());

        let dets: DetectionOutput = serde_json::from_str(
            r#"{"detections":[{"class_id":67,"confidence":0.8,"bbox":[1,2,30,40]}]}"#,
        )
        .unwrap();
        assert_eq!(dets.detections[0].class_id, 67);
        assert_eq!(dets.detections[0].bbox, [1.0, 2.0, 30.0, 40.0]);

        let none: EmbeddingOutput = serde_json::from_str("{}").unwrap();
        assert!(none.faces.is_empty());
    }
}
