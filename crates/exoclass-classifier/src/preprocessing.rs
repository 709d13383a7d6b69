//! Fitted preprocessing stages: missing-value imputation and standardization.
//!
//! Both stages only apply statistics learned at training time; nothing is
//! re-estimated from the rows being predicted. The concrete types read the
//! JSON exports of a median `SimpleImputer` and a `StandardScaler`.

use serde::{Deserialize, Serialize};

use crate::error::{Stage, TransformError};
use crate::math::Array2;

/// Fills missing cells of a schema-shaped matrix.
pub trait Imputer: Send + Sync {
    /// Number of columns this imputer was fitted on.
    fn n_features(&self) -> usize;

    /// Column names seen at fit time, when the export recorded them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn impute(&self, x: &Array2<Option<f64>>) -> Result<Array2<f64>, TransformError>;
}

/// Per-column affine normalization of an imputed matrix.
pub trait Scaler: Send + Sync {
    fn n_features(&self) -> usize;

    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn scale(&self, x: &Array2<f64>) -> Result<Array2<f64>, TransformError>;
}

fn check_width(stage: Stage, expected: usize, found: usize) -> Result<(), TransformError> {
    if expected != found {
        return Err(TransformError::new(
            stage,
            format!("expected {} columns, got {}", expected, found),
        ));
    }
    Ok(())
}

/// Constant-per-column imputer (median, mean or most-frequent at fit time).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimpleImputer {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// One fill value per schema column.
    pub statistics: Vec<f64>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

fn default_strategy() -> String {
    "median".to_string()
}

impl SimpleImputer {
    pub fn new(statistics: Vec<f64>) -> Self {
        Self {
            strategy: default_strategy(),
            statistics,
            feature_names: None,
        }
    }

    /// Check the fitted parameters are usable.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(col) = self.statistics.iter().position(|v| !v.is_finite()) {
            return Err(format!(
                "statistic for column {} is not finite; the column had no observed values at fit time",
                col
            ));
        }
        Ok(())
    }
}

impl Imputer for SimpleImputer {
    fn n_features(&self) -> usize {
        self.statistics.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn impute(&self, x: &Array2<Option<f64>>) -> Result<Array2<f64>, TransformError> {
        check_width(Stage::Imputation, self.statistics.len(), x.ncols())?;
        x.try_map_columns(|col, v| Ok(v.unwrap_or(self.statistics[col])))
    }
}

/// Standard scaler: `(x - mean) / scale` per column.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            mean,
            scale,
            feature_names: None,
        }
    }

    /// Check the fitted parameters and promote zero scales to 1.0, matching
    /// how constant columns are handled at fit time.
    pub fn validate(&mut self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if let Some(col) = self.mean.iter().position(|v| !v.is_finite()) {
            return Err(format!("mean for column {} is not finite", col));
        }
        for (col, s) in self.scale.iter_mut().enumerate() {
            if !s.is_finite() || *s < 0.0 {
                return Err(format!("scale for column {} is {}", col, s));
            }
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn scale(&self, x: &Array2<f64>) -> Result<Array2<f64>, TransformError> {
        check_width(Stage::Scaling, self.mean.len(), x.ncols())?;
        x.try_map_columns(|col, v| {
            let scaled = (v - self.mean[col]) / self.scale[col];
            if scaled.is_finite() {
                Ok(scaled)
            } else {
                Err(TransformError::new(
                    Stage::Scaling,
                    format!("column {} scaled to a non-finite value", col),
                ))
            }
        })
    }
}
