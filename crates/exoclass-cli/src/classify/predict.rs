//! CLI prediction helpers for exoclass-classifier.
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use exoclass_classifier::io::{read_candidate_csv, read_candidate_csv_with_config, CandidateReaderConfig};
use exoclass_classifier::{
    load_predictor_config, ArtifactKind, BundleSummary, PredictionResult, Predictor,
    PredictorConfig,
};

/// Number of leading catalog rows `sample` draws from by default.
pub const DEFAULT_SAMPLE_HEAD: usize = 100;

/// One prediction as written by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRow {
    /// 1-based data row in the input file.
    pub row: usize,
    #[serde(flatten)]
    pub result: PredictionResult,
}

/// Command-line values that override the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub artifacts_dir: Option<PathBuf>,
    pub files: Vec<(ArtifactKind, String)>,
}

/// Build the predictor configuration: the JSON file when given, defaults
/// otherwise, then any command-line overrides on top.
pub fn resolve_config(
    config_path: Option<&PathBuf>,
    overrides: &ConfigOverrides,
) -> Result<PredictorConfig> {
    let mut config = match config_path {
        Some(path) => load_predictor_config(path)?,
        None => PredictorConfig::default(),
    };
    if let Some(dir) = &overrides.artifacts_dir {
        config.artifacts_dir = dir.clone();
    }
    for (kind, name) in &overrides.files {
        config.files.set_file_name(*kind, name.clone());
    }
    Ok(config)
}

/// Load the bundle, failing when the model is unavailable.
pub fn load_predictor(config: &PredictorConfig) -> Result<Predictor> {
    let predictor = Predictor::from_config(config);
    match predictor.unavailable_reason() {
        Some(reason) => Err(anyhow!("Model unavailable: {}", reason)),
        None => Ok(predictor),
    }
}

/// Predict every row of a candidate table.
pub fn predict_file<P: AsRef<Path>>(predictor: &Predictor, input: P) -> Result<Vec<PredictionRow>> {
    let records = read_candidate_csv(&input)?;
    log::info!(
        "Classifying {} candidates from {}",
        records.len(),
        input.as_ref().display()
    );

    let rows: Vec<PredictionRow> = predictor
        .predict_batch(&records)
        .into_iter()
        .enumerate()
        .map(|(i, result)| PredictionRow { row: i + 1, result })
        .collect();

    let failed = rows.iter().filter(|r| !r.result.is_success()).count();
    if failed > 0 {
        log::warn!("{} of {} rows could not be classified", failed, rows.len());
    }
    Ok(rows)
}

/// Predict one row drawn at random from the first `head` rows of a catalog.
pub fn sample_file<P: AsRef<Path>>(
    predictor: &Predictor,
    input: P,
    head: usize,
    seed: Option<u64>,
) -> Result<PredictionRow> {
    if head == 0 {
        return Err(anyhow!("--head must be at least 1"));
    }
    let config = CandidateReaderConfig {
        max_rows: Some(head),
        ..Default::default()
    };
    let records = read_candidate_csv_with_config(&input, &config)?;
    if records.is_empty() {
        return Err(anyhow!(
            "No candidate rows in {}",
            input.as_ref().display()
        ));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let idx = rng.gen_range(0..records.len());
    log::info!("Sampled row {} of the first {}", idx + 1, records.len());

    Ok(PredictionRow {
        row: idx + 1,
        result: predictor.predict(&records[idx]),
    })
}

/// Summary of the loaded bundle.
pub fn inspect(predictor: &Predictor) -> Result<BundleSummary> {
    predictor
        .bundle()
        .map(|bundle| bundle.summary())
        .context("Model unavailable")
}
