//! Analyzer construction.

use std::time::Duration;

use frameaudit_common::{AppConfig, ModelsConfig};
use frameaudit_summary_model::AnalyzerKind;

use crate::analyzer::Analyzer;
use crate::backend::{
    CommandBackend, DetectionOutput, EmbeddingOutput, FaceMeshOutput, HeadPoseOutput,
};
use crate::error::AnalyzerError;
use crate::gaze::GazeAnalyzer;
use crate::headpose::HeadPoseAnalyzer;
use crate::identity::IdentityAnalyzer;
use crate::persons::PersonsAnalyzer;
use crate::phone::PhoneAnalyzer;

/// Builds fresh analyzer instances. Called once per analyzer per video,
/// so no analyzer state outlives a video.
pub trait AnalyzerFactory: Send + Sync {
    fn create(&self, kind: AnalyzerKind) -> Result<Box<dyn Analyzer>, AnalyzerError>;
}

/// Builds analyzers backed by external detector programs.
#[derive(Debug, Clone)]
pub struct CommandAnalyzerFactory {
    models: ModelsConfig,
    timeout: Duration,
}

impl CommandAnalyzerFactory {
    pub fn new(models: ModelsConfig, timeout: Duration) -> Self {
        Self { models, timeout }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AnalyzerError> {
        let timeout = Duration::try_from_secs_f64(config.analysis.call_timeout_secs)
            .map_err(|e| AnalyzerError::load(format!("invalid call timeout: {e}")))?;
        Ok(Self::new(config.models.clone(), timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl AnalyzerFactory for CommandAnalyzerFactory {
    fn create(&self, kind: AnalyzerKind) -> Result<Box<dyn Analyzer>, AnalyzerError> {
        let models = &self.models;
        let analyzer: Box<dyn Analyzer> = match kind {
            AnalyzerKind::Gaze => {
                let backend =
                    CommandBackend::<FaceMeshOutput>::load(&models.gaze.command, self.timeout)?;
                Box::new(GazeAnalyzer::new(
                    Box::new(backend),
                    models.gaze.away_angle_deg,
                ))
            }
            AnalyzerKind::HeadPose => {
                let backend =
                    CommandBackend::<HeadPoseOutput>::load(&models.headpose, self.timeout)?;
                Box::new(HeadPoseAnalyzer::new(Box::new(backend)))
            }
            AnalyzerKind::Identity => {
                let backend = CommandBackend::<EmbeddingOutput>::load(
                    &models.identity.command,
                    self.timeout,
                )?;
                Box::new(IdentityAnalyzer::new(
                    Box::new(backend),
                    models.identity.match_threshold,
                ))
            }
            AnalyzerKind::Persons => {
                let backend = CommandBackend::<DetectionOutput>::load(
                    &models.persons.command,
                    self.timeout,
                )?;
                Box::new(PersonsAnalyzer::new(Box::new(backend), &models.persons))
            }
            AnalyzerKind::Phone => {
                let backend =
                    CommandBackend::<DetectionOutput>::load(&models.phone.command, self.timeout)?;
                Box::new(PhoneAnalyzer::new(Box::new(backend), &models.phone))
            }
        };
        Ok(analyzer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameaudit_common::DetectorCommand;

    #[test]
    fn test_missing_detector_fails_to_load() {
        let mut models = ModelsConfig::default();
        models.phone.command = DetectorCommand::new(["frameaudit-no-such-detector"]);
        let factory = CommandAnalyzerFactory::new(models, Duration::from_secs(1));

        let err = factory.create(AnalyzerKind::Phone).err().unwrap();
        assert!(matches!(err, AnalyzerError::Load(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_creates_analyzer_of_requested_kind() {
        let mut models = ModelsConfig::default();
        models.headpose = DetectorCommand::new(["sh", "-c", "echo '{}'", "detector"]);
        let factory = CommandAnalyzerFactory::new(models, Duration::from_secs(5));

        let analyzer = factory.create(AnalyzerKind::HeadPose).unwrap();
        assert_eq!(analyzer.kind(), AnalyzerKind::HeadPose);
        assert_eq!(analyzer.name(), "headpose");
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let mut config = AppConfig::default();
        config.analysis.call_timeout_secs = -1.0;
        assert!(CommandAnalyzerFactory::from_config(&config).is_err());
    }
}
