//! Error types for artifact loading and per-call transform failures.
use std::fmt;
use std::path::PathBuf;

use crate::config::ArtifactKind;

/// Failure to bring up the artifact bundle. Fatal to serving.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactLoadError {
    #[error("cannot read {artifact} artifact at {}: {source}", .path.display())]
    Io {
        artifact: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {artifact} artifact at {}: {source}", .path.display())]
    Parse {
        artifact: ArtifactKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {artifact} artifact: {reason}")]
    Invalid {
        artifact: ArtifactKind,
        reason: String,
    },
    #[error("{artifact} artifact expects {found} {what}, but the bundle requires {expected}")]
    ShapeMismatch {
        artifact: ArtifactKind,
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{artifact} artifact was fitted on columns in a different order than the feature schema")]
    ColumnOrderMismatch { artifact: ArtifactKind },
}

impl ArtifactLoadError {
    pub(crate) fn invalid(artifact: ArtifactKind, reason: impl Into<String>) -> Self {
        ArtifactLoadError::Invalid {
            artifact,
            reason: reason.into(),
        }
    }
}

/// Pipeline step that produced a [`TransformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Reconciliation,
    Imputation,
    Scaling,
    Classification,
    Decoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reconciliation => "reconciliation",
            Stage::Imputation => "imputation",
            Stage::Scaling => "scaling",
            Stage::Classification => "classification",
            Stage::Decoding => "decoding",
        };
        f.write_str(name)
    }
}

/// A failure inside one prediction call, tagged with the stage that raised it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{stage} failed: {message}")]
pub struct TransformError {
    pub stage: Stage,
    pub message: String,
}

impl TransformError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        TransformError {
            stage,
            message: message.into(),
        }
    }
}

/// Error carried by a failed [`PredictionResult`](crate::predictor::PredictionResult).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl PredictionError {
    /// Stage tag for transform failures, `None` when the model never loaded.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PredictionError::ModelUnavailable { .. } => None,
            PredictionError::Transform(e) => Some(e.stage),
        }
    }
}
