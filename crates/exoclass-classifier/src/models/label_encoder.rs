use serde::{Deserialize, Serialize};

use crate::error::{Stage, TransformError};

/// Bijection between class indices and human readable class names.
pub trait LabelCodec: Send + Sync {
    fn decode(&self, index: usize) -> Result<&str, TransformError>;

    /// Class names in index order; position `i` names probability `i`.
    fn class_order(&self) -> &[String];
}

/// Label encoder exported as its ordered `classes` list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("no classes".to_string());
        }
        for (i, name) in self.classes.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(format!("class {} has an empty name", i));
            }
            if self.classes[..i].contains(name) {
                return Err(format!("class '{}' is listed more than once", name));
            }
        }
        Ok(())
    }
}

impl LabelCodec for LabelEncoder {
    fn decode(&self, index: usize) -> Result<&str, TransformError> {
        self.classes.get(index).map(String::as_str).ok_or_else(|| {
            TransformError::new(
                Stage::Decoding,
                format!(
                    "class index {} is outside the {} known classes",
                    index,
                    self.classes.len()
                ),
            )
        })
    }

    fn class_order(&self) -> &[String] {
        &self.classes
    }
}
