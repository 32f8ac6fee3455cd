use std::fmt::Debug;
use std::path::Path;

use tracing::info;

use crate::error::{ErrorCategory, EvaluatorError, Result};
use crate::evaluator::Evaluator;
use crate::loaded::LoadedEvaluator;

/// A parsed, typed manifest for one backend kind.
///
/// Parsing happens in the [`Registry`](crate::Registry) and performs no I/O.
/// All artifact access is deferred to `create`.
pub trait EvaluatorManifest: Send + Sync + Debug {
    /// The discriminator this manifest was registered under.
    fn kind(&self) -> &str;

    /// Load the backend from `artifact_dir`.
    ///
    /// May block on file I/O or native initialization. Must either return a
    /// fully initialized evaluator or fail; a missing file should be reported
    /// as [`EvaluatorError::MissingArtifact`].
    fn create(&self, artifact_dir: &Path) -> Result<Box<dyn Evaluator>>;
}

/// A manifest resolved against the registry, ready to be created.
#[derive(Debug)]
pub struct Manifest {
    inner: Box<dyn EvaluatorManifest>,
}

impl Manifest {
    pub fn new(inner: Box<dyn EvaluatorManifest>) -> Self {
        Manifest { inner }
    }

    pub fn kind(&self) -> &str {
        self.inner.kind()
    }

    pub fn inner(&self) -> &dyn EvaluatorManifest {
        self.inner.as_ref()
    }

    /// Build a ready evaluator from the artifacts under `artifact_dir`.
    ///
    /// Backend failures that are not already configuration or load errors
    /// are wrapped as [`EvaluatorError::Load`] naming this manifest's kind.
    pub fn create(&self, artifact_dir: &Path) -> Result<LoadedEvaluator> {
        if !artifact_dir.is_dir() {
            return Err(EvaluatorError::ArtifactDirectory {
                path: artifact_dir.to_path_buf(),
            });
        }

        let kind = self.kind().to_string();
        let evaluator = self.inner.create(artifact_dir).map_err(|e| match e.category() {
            ErrorCategory::Configuration | ErrorCategory::Load => e,
            _ => EvaluatorError::Load {
                kind: kind.clone(),
                source: Box::new(e),
            },
        })?;

        info!(
            kind = %kind,
            artifact_dir = %artifact_dir.display(),
            inputs = evaluator.schema().inputs.len(),
            outputs = evaluator.schema().outputs.len(),
            "loaded evaluator"
        );
        Ok(LoadedEvaluator::new(kind, artifact_dir, evaluator))
    }
}
