use std::path::PathBuf;

use sr_tensor::{DataType, Shape, TensorError};
use thiserror::Error;

use crate::schema::ShapePattern;

/// Failure raised by a plugin while loading or computing.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse failure category, for callers that route on the kind of error
/// rather than its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or unresolvable manifest. Raised before any artifact I/O.
    Configuration,
    /// A backend failed to initialize from its artifact directory.
    Load,
    /// A tensor disagrees with a declared dtype or shape.
    Schema,
    /// The backend failed during computation.
    Evaluation,
    /// Tensor/table conversion failure.
    Conversion,
}

#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest has no 'type' discriminator")]
    MissingKind,
    #[error("unknown evaluator kind '{kind}' (registered: {known:?})")]
    UnknownKind { kind: String, known: Vec<String> },
    #[error("evaluator kind '{0}' is already registered")]
    DuplicateKind(String),
    #[error("invalid '{kind}' manifest: {reason}")]
    InvalidManifest { kind: String, reason: String },
    #[error("artifact directory {} does not exist or is not a directory", path.display())]
    ArtifactDirectory { path: PathBuf },
    #[error("failed to read manifest {}: {source}", path.display())]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no manifest found in {}", path.display())]
    NoManifest { path: PathBuf },

    #[error("'{kind}' evaluator is missing artifact {}", path.display())]
    MissingArtifact { kind: String, path: PathBuf },
    #[error("failed to load '{kind}' evaluator: {source}")]
    Load {
        kind: String,
        #[source]
        source: BackendError,
    },

    #[error("missing required input '{name}'")]
    MissingInput { name: String },
    #[error("backend did not produce declared output '{name}'")]
    MissingOutput { name: String },
    #[error("backend produced undeclared output '{name}'")]
    UndeclaredOutput { name: String },
    #[error("tensor '{name}' has dtype {got}, expected {expected}")]
    DTypeMismatch {
        name: String,
        expected: DataType,
        got: DataType,
    },
    #[error("tensor '{name}' has shape {got}, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: ShapePattern,
        got: Shape,
    },

    #[error("'{kind}' evaluation failed for inputs {inputs:?}: {source}")]
    Evaluation {
        kind: String,
        inputs: Vec<String>,
        #[source]
        source: BackendError,
    },

    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

impl EvaluatorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EvaluatorError::Json(_)
            | EvaluatorError::MissingKind
            | EvaluatorError::UnknownKind { .. }
            | EvaluatorError::DuplicateKind(_)
            | EvaluatorError::InvalidManifest { .. }
            | EvaluatorError::ArtifactDirectory { .. }
            | EvaluatorError::ManifestIo { .. }
            | EvaluatorError::NoManifest { .. } => ErrorCategory::Configuration,
            EvaluatorError::MissingArtifact { .. } | EvaluatorError::Load { .. } => {
                ErrorCategory::Load
            }
            EvaluatorError::MissingInput { .. }
            | EvaluatorError::MissingOutput { .. }
            | EvaluatorError::UndeclaredOutput { .. }
            | EvaluatorError::DTypeMismatch { .. }
            | EvaluatorError::ShapeMismatch { .. } => ErrorCategory::Schema,
            EvaluatorError::Evaluation { .. } => ErrorCategory::Evaluation,
            EvaluatorError::Tensor(
                TensorError::Conversion(_)
                | TensorError::DifferentColumnLength { .. }
                | TensorError::UnexpectedCell { .. },
            ) => ErrorCategory::Conversion,
            EvaluatorError::Tensor(_) => ErrorCategory::Schema,
        }
    }

    /// Shorthand for a configuration error on a manifest of `kind`.
    pub fn invalid_manifest(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        EvaluatorError::InvalidManifest {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a load failure of a `kind` backend.
    pub fn load(kind: impl Into<String>, source: impl Into<BackendError>) -> Self {
        EvaluatorError::Load {
            kind: kind.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EvaluatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            EvaluatorError::UnknownKind {
                kind: "x".into(),
                known: vec![]
            }
            .category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            EvaluatorError::load("dense", "corrupt").category(),
            ErrorCategory::Load
        );
        assert_eq!(
            EvaluatorError::MissingInput { name: "a".into() }.category(),
            ErrorCategory::Schema
        );
        assert_eq!(
            EvaluatorError::from(TensorError::Conversion("x".into())).category(),
            ErrorCategory::Conversion
        );
        assert_eq!(
            EvaluatorError::from(TensorError::NotFound("x".into())).category(),
            ErrorCategory::Schema
        );
    }

    #[test]
    fn test_load_message_names_kind_and_cause() {
        let err = EvaluatorError::load("dense", "weights.bin is truncated");
        assert_eq!(
            err.to_string(),
            "failed to load 'dense' evaluator: weights.bin is truncated"
        );
    }
}
