pub mod classifier_trait;
pub mod label_encoder;
pub mod xgboost;

pub use classifier_trait::{Classification, Classifier};
pub use label_encoder::{LabelCodec, LabelEncoder};
pub use xgboost::XGBoostClassifier;
