use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The five artifacts that make up a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Classifier,
    Imputer,
    Scaler,
    LabelEncoder,
    FeatureColumns,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Classifier,
        ArtifactKind::Imputer,
        ArtifactKind::Scaler,
        ArtifactKind::LabelEncoder,
        ArtifactKind::FeatureColumns,
    ];
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Imputer => "imputer",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::LabelEncoder => "label encoder",
            ArtifactKind::FeatureColumns => "feature columns",
        };
        f.write_str(name)
    }
}

/// File names of the five artifacts inside the artifact directory.
///
/// These depend on whatever the training export produced, so every name is
/// overridable from the config file or the command line.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactFiles {
    pub classifier: String,
    pub imputer: String,
    pub scaler: String,
    pub label_encoder: String,
    pub feature_columns: String,
}

impl Default for ArtifactFiles {
    fn default() -> Self {
        Self {
            classifier: "classifier.json".to_string(),
            imputer: "imputer.json".to_string(),
            scaler: "scaler.json".to_string(),
            label_encoder: "label_encoder.json".to_string(),
            feature_columns: "feature_columns.json".to_string(),
        }
    }
}

impl ArtifactFiles {
    pub fn file_name(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Classifier => &self.classifier,
            ArtifactKind::Imputer => &self.imputer,
            ArtifactKind::Scaler => &self.scaler,
            ArtifactKind::LabelEncoder => &self.label_encoder,
            ArtifactKind::FeatureColumns => &self.feature_columns,
        }
    }

    pub fn set_file_name(&mut self, kind: ArtifactKind, name: impl Into<String>) {
        let slot = match kind {
            ArtifactKind::Classifier => &mut self.classifier,
            ArtifactKind::Imputer => &mut self.imputer,
            ArtifactKind::Scaler => &mut self.scaler,
            ArtifactKind::LabelEncoder => &mut self.label_encoder,
            ArtifactKind::FeatureColumns => &mut self.feature_columns,
        };
        *slot = name.into();
    }

    /// Resolve the on-disk path of one artifact inside `dir`.
    pub fn path_in(&self, dir: &Path, kind: ArtifactKind) -> PathBuf {
        dir.join(self.file_name(kind))
    }
}

/// Central configuration for the predictor.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PredictorConfig {
    pub artifacts_dir: PathBuf,
    pub files: ArtifactFiles,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
            files: ArtifactFiles::default(),
        }
    }
}

impl PredictorConfig {
    pub fn new<P: Into<PathBuf>>(artifacts_dir: P, files: ArtifactFiles) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
            files,
        }
    }
}

/// Load a predictor configuration from a JSON file.
pub fn load_predictor_config<P: AsRef<Path>>(path: P) -> Result<PredictorConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: PredictorConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_default_file_names() {
        let cfg: PredictorConfig = serde_json::from_str(
            r#"{"artifacts_dir": "models/v2", "files": {"classifier": "xgb_best.json"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.artifacts_dir, PathBuf::from("models/v2"));
        assert_eq!(cfg.files.classifier, "xgb_best.json");
        assert_eq!(cfg.files.scaler, "scaler.json");
    }

    #[test]
    fn set_file_name_targets_one_artifact() {
        let mut files = ArtifactFiles::default();
        files.set_file_name(ArtifactKind::LabelEncoder, "labels.json");
        assert_eq!(files.file_name(ArtifactKind::LabelEncoder), "labels.json");
        assert_eq!(
            files.path_in(Path::new("a"), ArtifactKind::LabelEncoder),
            Path::new("a").join("labels.json")
        );
        assert_eq!(files.imputer, "imputer.json");
    }

    #[test]
    fn every_kind_has_a_distinct_default_name() {
        let files = ArtifactFiles::default();
        let mut names: Vec<&str> = ArtifactKind::ALL.iter().map(|k| files.file_name(*k)).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
