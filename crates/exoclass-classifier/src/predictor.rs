//! Inference Pipeline.
//!
//! A [`Predictor`] owns (a shared handle to) one [`ArtifactBundle`] and runs
//! every record through the same fixed chain: reconcile, warn, impute,
//! scale, classify, decode. Failures are captured per record in the returned
//! [`PredictionResult`]; `predict` itself never fails.
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, warn};
use rayon::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::artifacts::ArtifactBundle;
use crate::config::{ArtifactFiles, PredictorConfig};
use crate::error::{PredictionError, Stage, TransformError};
use crate::schema::{CandidateRecord, Reconciled};

/// Non-fatal notice that one or more schema columns were filled with
/// training-time statistics instead of values from the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaWarning {
    /// Schema columns absent from the input, sorted by name.
    pub missing_columns: Vec<String>,
    /// Schema columns present in the input without a usable value (blank,
    /// NaN, null), sorted by name.
    pub empty_columns: Vec<String>,
}

impl SchemaWarning {
    /// `None` when every schema column carried a value.
    pub fn from_reconciled(reconciled: &Reconciled) -> Option<Self> {
        if !reconciled.needs_imputation() {
            return None;
        }
        Some(Self {
            missing_columns: reconciled.missing_columns.clone(),
            empty_columns: reconciled.empty_columns.clone(),
        })
    }

    pub fn message(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.missing_columns.is_empty() {
            parts.push(format!(
                "{} column(s) were not found in the input: {}",
                self.missing_columns.len(),
                self.missing_columns.join(", ")
            ));
        }
        if !self.empty_columns.is_empty() {
            parts.push(format!(
                "{} column(s) had no value in the input: {}",
                self.empty_columns.len(),
                self.empty_columns.join(", ")
            ));
        }
        format!(
            "{}; these were filled with values learned at training time and prediction \
             accuracy may be reduced",
            parts.join("; ")
        )
    }
}

impl Serialize for SchemaWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SchemaWarning", 3)?;
        state.serialize_field("message", &self.message())?;
        state.serialize_field("missing_columns", &self.missing_columns)?;
        state.serialize_field("empty_columns", &self.empty_columns)?;
        state.end()
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<PredictionError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Outcome of one prediction.
///
/// Either `prediction` and `confidence` are set, or `error` is. `warning` is
/// only ever present alongside a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub prediction: Option<String>,
    /// Class name to probability.
    pub confidence: Option<BTreeMap<String, f64>>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<PredictionError>,
    pub warning: Option<SchemaWarning>,
}

impl PredictionResult {
    pub fn success(
        prediction: String,
        confidence: BTreeMap<String, f64>,
        warning: Option<SchemaWarning>,
    ) -> Self {
        Self {
            prediction: Some(prediction),
            confidence: Some(confidence),
            error: None,
            warning,
        }
    }

    pub fn failure(error: PredictionError) -> Self {
        Self {
            prediction: None,
            confidence: None,
            error: Some(error),
            warning: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs candidate records through the loaded artifact bundle.
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: Option<Arc<ArtifactBundle>>,
    unavailable_reason: String,
}

impl Predictor {
    pub fn new(bundle: Arc<ArtifactBundle>) -> Self {
        Self {
            bundle: Some(bundle),
            unavailable_reason: String::new(),
        }
    }

    /// A predictor with no bundle; every call reports the model as unavailable.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            bundle: None,
            unavailable_reason: reason.into(),
        }
    }

    /// Load the bundle from `dir`.
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory holding the five artifact files
    /// * `files` - File name of each artifact inside `dir`
    ///
    /// # Returns
    ///
    /// A predictor that is available if and only if the whole bundle loaded.
    /// A load failure is logged and kept as the unavailability reason.
    pub fn load<P: AsRef<Path>>(dir: P, files: &ArtifactFiles) -> Self {
        match ArtifactBundle::load_with_files(dir.as_ref(), files) {
            Ok(bundle) => Self::new(Arc::new(bundle)),
            Err(e) => {
                error!("Model unavailable: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn from_config(config: &PredictorConfig) -> Self {
        Self::load(&config.artifacts_dir, &config.files)
    }

    pub fn is_available(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn bundle(&self) -> Option<&Arc<ArtifactBundle>> {
        self.bundle.as_ref()
    }

    /// Why the bundle is missing, `None` when the predictor is available.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self.bundle {
            Some(_) => None,
            None => Some(&self.unavailable_reason),
        }
    }

    /// Classify one record.
    pub fn predict(&self, record: &CandidateRecord) -> PredictionResult {
        let bundle = match &self.bundle {
            Some(bundle) => bundle,
            None => {
                return PredictionResult::failure(PredictionError::ModelUnavailable {
                    reason: self.unavailable_reason.clone(),
                })
            }
        };
        match run_pipeline(bundle, record) {
            Ok(result) => result,
            Err(e) => {
                debug!("Prediction failed: {}", e);
                PredictionResult::failure(e.into())
            }
        }
    }

    /// Classify many records in parallel. Output order matches input order,
    /// and each record succeeds or fails on its own.
    pub fn predict_batch(&self, records: &[CandidateRecord]) -> Vec<PredictionResult> {
        records.par_iter().map(|r| self.predict(r)).collect()
    }
}

fn run_pipeline(
    bundle: &ArtifactBundle,
    record: &CandidateRecord,
) -> Result<PredictionResult, TransformError> {
    let reconciled = bundle.schema().reconcile(record)?;

    let warning = SchemaWarning::from_reconciled(&reconciled);
    if let Some(warning) = &warning {
        warn!("{}", warning.message());
    }

    let imputed = bundle.imputer().impute(&reconciled.into_matrix())?;
    let scaled = bundle.scaler().scale(&imputed)?;

    let classification = bundle
        .classifier()
        .classify(&scaled)?
        .into_iter()
        .next()
        .ok_or_else(|| TransformError::new(Stage::Classification, "classifier returned no rows"))?;

    let labels = bundle.labels();
    let class_order = labels.class_order();
    if classification.probabilities.len() != class_order.len() {
        return Err(TransformError::new(
            Stage::Decoding,
            format!(
                "classifier returned {} probabilities for {} classes",
                classification.probabilities.len(),
                class_order.len()
            ),
        ));
    }
    let prediction = labels.decode(classification.class_index)?.to_string();
    let confidence = class_order
        .iter()
        .cloned()
        .zip(classification.probabilities.iter().copied())
        .collect();

    Ok(PredictionResult::success(prediction, confidence, warning))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_predictor_short_circuits() {
        let predictor = Predictor::unavailable("feature columns file missing");
        assert!(!predictor.is_available());
        assert_eq!(
            predictor.unavailable_reason(),
            Some("feature columns file missing")
        );

        let result = predictor.predict(&CandidateRecord::new().with("score", 0.9));
        assert!(!result.is_success());
        assert!(result.prediction.is_none());
        assert!(result.confidence.is_none());
        assert!(result.warning.is_none());
        assert_eq!(result.error.as_ref().and_then(|e| e.stage()), None);
    }

    #[test]
    fn warning_message_names_count_and_columns() {
        let warning = SchemaWarning {
            missing_columns: vec!["depth".into(), "temp".into()],
            ..Default::default()
        };
        let message = warning.message();
        assert!(message.starts_with("2 column(s) were not found"));
        assert!(message.contains("depth, temp"));
        assert!(message.contains("training time"));
        assert!(!message.contains("had no value"));
    }

    #[test]
    fn warning_message_names_empty_columns() {
        let warning = SchemaWarning {
            missing_columns: vec!["temp".into()],
            empty_columns: vec!["depth".into(), "period".into()],
        };
        let message = warning.message();
        assert!(message.starts_with("1 column(s) were not found in the input: temp"));
        assert!(message.contains("2 column(s) had no value in the input: depth, period"));
    }

    #[test]
    fn no_warning_when_nothing_was_imputed() {
        let reconciled = Reconciled {
            row: vec![Some(1.0)],
            missing_columns: vec![],
            empty_columns: vec![],
        };
        assert_eq!(SchemaWarning::from_reconciled(&reconciled), None);

        let reconciled = Reconciled {
            row: vec![None],
            missing_columns: vec![],
            empty_columns: vec!["depth".into()],
        };
        let warning = SchemaWarning::from_reconciled(&reconciled).unwrap();
        assert_eq!(warning.empty_columns, vec!["depth"]);
    }

    #[test]
    fn failure_serializes_error_as_text() {
        let result = PredictionResult::failure(
            TransformError::new(Stage::Scaling, "column 3 scaled to a non-finite value").into(),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["prediction"], serde_json::Value::Null);
        assert_eq!(
            value["error"],
            "scaling failed: column 3 scaled to a non-finite value"
        );
    }

    #[test]
    fn warning_serializes_message_and_columns() {
        let warning = SchemaWarning {
            missing_columns: vec!["temp".into()],
            empty_columns: vec!["depth".into()],
        };
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["missing_columns"][0], "temp");
        assert_eq!(value["empty_columns"][0], "depth");
        assert!(value["message"].as_str().unwrap().starts_with("1 column(s)"));
    }
}
