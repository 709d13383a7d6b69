//! exoclass-classifier: disposition classifier for transit-signal candidates.
//!
//! The crate loads a bundle of fitted artifacts (feature schema, imputer,
//! scaler, label encoder and an XGBoost tree ensemble exported as JSON) and
//! runs candidate rows through the fixed inference chain to produce a
//! `Confirmed` / `Candidate` / `False Positive` call with per-class
//! confidence.
//!
//! Loading is the only fallible entry point. Once a [`Predictor`] exists,
//! every call returns a [`PredictionResult`] that carries either a
//! prediction or a stage-tagged error.
pub mod artifacts;
pub mod config;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod predictor;
pub mod preprocessing;
pub mod schema;

pub use artifacts::{ArtifactBundle, BundleSummary};
pub use config::{load_predictor_config, ArtifactFiles, ArtifactKind, PredictorConfig};
pub use error::{ArtifactLoadError, PredictionError, Stage, TransformError};
pub use predictor::{PredictionResult, Predictor, SchemaWarning};
pub use schema::{CandidateRecord, FeatureSchema, FieldValue};
