//! Artifact Store: loads the five fitted artifacts as one validated bundle.
//!
//! A bundle is all-or-nothing. Every file must exist and parse, and the
//! imputer, scaler and classifier must all agree with the feature schema on
//! width (and on column order, when the export recorded column names) before
//! the bundle is handed to a [`Predictor`](crate::predictor::Predictor).
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ArtifactFiles, ArtifactKind, PredictorConfig};
use crate::error::ArtifactLoadError;
use crate::models::{Classifier, LabelCodec, LabelEncoder, XGBoostClassifier};
use crate::preprocessing::{Imputer, Scaler, SimpleImputer, StandardScaler};
use crate::schema::FeatureSchema;

/// Immutable, jointly validated set of fitted artifacts.
pub struct ArtifactBundle {
    schema: FeatureSchema,
    imputer: Box<dyn Imputer>,
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
    labels: Box<dyn LabelCodec>,
}

impl fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("columns", &self.schema.columns())
            .field("classes", &self.labels.class_order())
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl ArtifactBundle {
    /// Load the bundle from `dir` using the default file names.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, ArtifactLoadError> {
        Self::load_with_files(dir, &ArtifactFiles::default())
    }

    /// Load the bundle described by a predictor configuration.
    pub fn load_from_config(config: &PredictorConfig) -> Result<Self, ArtifactLoadError> {
        Self::load_with_files(&config.artifacts_dir, &config.files)
    }

    /// Load the bundle from `dir` with explicit file names.
    pub fn load_with_files<P: AsRef<Path>>(
        dir: P,
        files: &ArtifactFiles,
    ) -> Result<Self, ArtifactLoadError> {
        let dir = dir.as_ref();
        info!("Loading model artifacts from {}", dir.display());

        let columns: Vec<String> = read_json(dir, files, ArtifactKind::FeatureColumns)?;
        let schema = FeatureSchema::new(columns)
            .map_err(|reason| ArtifactLoadError::invalid(ArtifactKind::FeatureColumns, reason))?;

        let imputer: SimpleImputer = read_json(dir, files, ArtifactKind::Imputer)?;
        imputer
            .validate()
            .map_err(|reason| ArtifactLoadError::invalid(ArtifactKind::Imputer, reason))?;

        let mut scaler: StandardScaler = read_json(dir, files, ArtifactKind::Scaler)?;
        scaler
            .validate()
            .map_err(|reason| ArtifactLoadError::invalid(ArtifactKind::Scaler, reason))?;

        let labels: LabelEncoder = read_json(dir, files, ArtifactKind::LabelEncoder)?;
        labels
            .validate()
            .map_err(|reason| ArtifactLoadError::invalid(ArtifactKind::LabelEncoder, reason))?;

        let classifier = XGBoostClassifier::from_model(read_json(
            dir,
            files,
            ArtifactKind::Classifier,
        )?)
        .map_err(|reason| ArtifactLoadError::invalid(ArtifactKind::Classifier, reason))?;

        let model_names = classifier.feature_names();
        if !model_names.is_empty() && model_names != schema.columns() {
            warn!(
                "Classifier was trained with feature names {:?}, which differ from the feature schema; \
                 inputs are matched by schema position",
                model_names
            );
        }
        let num_trees = classifier.num_trees();

        let bundle = Self::from_parts(
            schema,
            Box::new(imputer),
            Box::new(scaler),
            Box::new(classifier),
            Box::new(labels),
        )?;

        info!(
            "Model artifacts loaded: {} feature columns, {} classes {:?}, {} trees",
            bundle.schema.len(),
            bundle.labels.class_order().len(),
            bundle.labels.class_order(),
            num_trees
        );
        Ok(bundle)
    }

    /// Assemble a bundle from any backend implementations, running the same
    /// cross-artifact checks as [`ArtifactBundle::load`].
    pub fn from_parts(
        schema: FeatureSchema,
        imputer: Box<dyn Imputer>,
        scaler: Box<dyn Scaler>,
        classifier: Box<dyn Classifier>,
        labels: Box<dyn LabelCodec>,
    ) -> Result<Self, ArtifactLoadError> {
        let width = schema.len();

        check_width(ArtifactKind::Imputer, width, imputer.n_features())?;
        check_order(ArtifactKind::Imputer, &schema, imputer.feature_names())?;

        check_width(ArtifactKind::Scaler, width, scaler.n_features())?;
        check_order(ArtifactKind::Scaler, &schema, scaler.feature_names())?;

        check_width(ArtifactKind::Classifier, width, classifier.n_features())?;

        let n_labels = labels.class_order().len();
        if classifier.n_classes() != n_labels {
            return Err(ArtifactLoadError::ShapeMismatch {
                artifact: ArtifactKind::Classifier,
                what: "classes",
                expected: n_labels,
                found: classifier.n_classes(),
            });
        }

        Ok(Self {
            schema,
            imputer,
            scaler,
            classifier,
            labels,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn imputer(&self) -> &dyn Imputer {
        self.imputer.as_ref()
    }

    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn labels(&self) -> &dyn LabelCodec {
        self.labels.as_ref()
    }

    pub fn summary(&self) -> BundleSummary {
        BundleSummary {
            feature_columns: self.schema.columns().to_vec(),
            classes: self.labels.class_order().to_vec(),
            classifier: self.classifier.name().to_string(),
            details: self
                .classifier
                .details()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Serializable description of a loaded bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleSummary {
    pub feature_columns: Vec<String>,
    pub classes: Vec<String>,
    pub classifier: String,
    pub details: BTreeMap<String, String>,
}

fn read_json<T: DeserializeOwned>(
    dir: &Path,
    files: &ArtifactFiles,
    artifact: ArtifactKind,
) -> Result<T, ArtifactLoadError> {
    let path = files.path_in(dir, artifact);
    let file = File::open(&path).map_err(|source| ArtifactLoadError::Io {
        artifact,
        path: path.clone(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactLoadError::Parse {
        artifact,
        path,
        source,
    })
}

fn check_width(
    artifact: ArtifactKind,
    expected: usize,
    found: usize,
) -> Result<(), ArtifactLoadError> {
    if expected != found {
        return Err(ArtifactLoadError::ShapeMismatch {
            artifact,
            what: "input columns",
            expected,
            found,
        });
    }
    Ok(())
}

fn check_order(
    artifact: ArtifactKind,
    schema: &FeatureSchema,
    names: Option<&[String]>,
) -> Result<(), ArtifactLoadError> {
    match names {
        Some(names) if names != schema.columns() => {
            Err(ArtifactLoadError::ColumnOrderMismatch { artifact })
        }
        _ => Ok(()),
    }
}
