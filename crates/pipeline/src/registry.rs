//! The set of analyzers loaded for one video.

use frameaudit_analyzers::{Analyzer, AnalyzerFactory};
use frameaudit_common::{FrameauditError, FrameauditResult};
use frameaudit_summary_model::AnalyzerKind;

/// Loaded analyzers in dispatch order.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// Load the named analyzers.
    ///
    /// Every name is checked before anything is loaded, and an unknown name
    /// fails the whole build. An analyzer that fails to load is logged and
    /// left out. Dispatch order follows `names`; repeated names load once.
    pub fn build<S: AsRef<str>>(
        names: &[S],
        factory: &dyn AnalyzerFactory,
    ) -> FrameauditResult<Self> {
        let mut kinds: Vec<AnalyzerKind> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let kind = name
                .parse::<AnalyzerKind>()
                .map_err(|_| FrameauditError::UnknownAnalyzer {
                    name: name.to_string(),
                })?;
            if kinds.contains(&kind) {
                tracing::warn!(analyzer = name, "Analyzer requested twice, loading once");
                continue;
            }
            kinds.push(kind);
        }

        let mut analyzers = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match factory.create(kind) {
                Ok(analyzer) => {
                    tracing::info!(analyzer = kind.as_str(), "Loaded analyzer");
                    analyzers.push(analyzer);
                }
                Err(e) => {
                    let err = FrameauditError::analyzer_load(kind.as_str(), e.to_string());
                    tracing::error!(analyzer = kind.as_str(), error = %err, "Dropping analyzer");
                }
            }
        }

        Self::from_analyzers(analyzers)
    }

    /// Wrap already constructed analyzers. Fails when `analyzers` is empty.
    pub fn from_analyzers(analyzers: Vec<Box<dyn Analyzer>>) -> FrameauditResult<Self> {
        if analyzers.is_empty() {
            return Err(FrameauditError::NoAnalyzersLoaded);
        }
        Ok(Self { analyzers })
    }

    /// Analyzer names in dispatch order.
    pub fn names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Analyzer>> {
        self.analyzers.iter_mut()
    }

    /// Clear per-video analyzer state.
    pub fn reset(&mut self) {
        for analyzer in &mut self.analyzers {
            analyzer.reset();
        }
    }
}

impl std::fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("analyzers", &self.names())
            .finish()
    }
}
