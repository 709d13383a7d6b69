use crate::error::TransformError;
use crate::math::Array2;

/// Per-row output of a [`Classifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Index of the most probable class.
    pub class_index: usize,
    /// One probability per class, in the classifier's class-index order.
    pub probabilities: Vec<f64>,
}

impl Classification {
    /// Build from a probability vector, picking the first maximum.
    pub fn from_probabilities(probabilities: Vec<f64>) -> Self {
        let mut class_index = 0;
        for (i, p) in probabilities.iter().enumerate() {
            if *p > probabilities[class_index] {
                class_index = i;
            }
        }
        Self {
            class_index,
            probabilities,
        }
    }
}

/// A small trait abstraction over fitted classifiers. Implementations must be
/// safe to call concurrently: inference never mutates the model.
pub trait Classifier: Send + Sync {
    /// Number of input columns the model was trained on.
    fn n_features(&self) -> usize;

    /// Number of classes in each probability vector.
    fn n_classes(&self) -> usize;

    /// Classify every row of a scaled, fully populated matrix.
    fn classify(&self, x: &Array2<f64>) -> Result<Vec<Classification>, TransformError>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }

    /// Backend specific facts worth reporting, such as the ensemble size.
    fn details(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}
