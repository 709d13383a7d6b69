//! Small dense-matrix type used by the transform chain.
//!
//! `Array2` is a row-major 2D container with just enough API for the
//! imputer, scaler and classifier stages. Rows are samples and columns are
//! schema features.
pub mod matrix;

pub use matrix::{Array2, ShapeError};
