//! Feature schema, candidate records and schema reconciliation.
//!
//! A `CandidateRecord` is whatever the caller has: a bag of named values that
//! may carry extra columns, lack some columns, or list them in any order.
//! Reconciliation projects it onto the ordered `FeatureSchema` the fitted
//! artifacts expect, leaving absent columns missing so the imputer fills them.
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Stage, TransformError};
use crate::math::Array2;

/// Cell tokens treated as missing when a record is read from text.
const MISSING_TOKENS: [&str; 6] = ["", "nan", "na", "n/a", "null", "none"];

/// One input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Interpret a raw text cell.
    pub fn from_cell(raw: &str) -> FieldValue {
        let trimmed = raw.trim();
        if MISSING_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
        {
            return FieldValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => FieldValue::Number(v),
            Err(_) => FieldValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the value: `Ok(None)` for missing, `Err` for anything
    /// that is not a finite number.
    pub fn to_numeric(&self) -> Result<Option<f64>, String> {
        match self {
            FieldValue::Missing => Ok(None),
            FieldValue::Number(v) if v.is_nan() => Ok(None),
            FieldValue::Number(v) if v.is_infinite() => Err(format!("infinite value {}", v)),
            FieldValue::Number(v) => Ok(Some(*v)),
            FieldValue::Text(s) => match FieldValue::from_cell(s) {
                FieldValue::Text(t) => Err(format!("non-numeric value '{}'", t)),
                other => other.to_numeric(),
            },
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Number)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One caller-supplied row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateRecord {
    values: BTreeMap<String, FieldValue>,
}

impl CandidateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        self.values.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for CandidateRecord
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        CandidateRecord {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Ordered list of column names the classifier was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema; rejects an empty list and duplicate names.
    pub fn new(columns: Vec<String>) -> Result<Self, String> {
        if columns.is_empty() {
            return Err("feature schema has no columns".to_string());
        }
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(format!("duplicate column '{}' in feature schema", name));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Project `record` onto this schema.
    ///
    /// Unknown columns are dropped. Absent columns stay missing and are
    /// reported in `missing_columns`; columns that are present without a
    /// value are reported in `empty_columns`. Both lists are sorted by name.
    pub fn reconcile(&self, record: &CandidateRecord) -> Result<Reconciled, TransformError> {
        let mut row = Vec::with_capacity(self.columns.len());
        let mut missing_columns = Vec::new();
        let mut empty_columns = Vec::new();

        for column in &self.columns {
            match record.get(column) {
                Some(value) => {
                    let numeric = value.to_numeric().map_err(|reason| {
                        TransformError::new(
                            Stage::Reconciliation,
                            format!("{} in column '{}'", reason, column),
                        )
                    })?;
                    if numeric.is_none() {
                        empty_columns.push(column.clone());
                    }
                    row.push(numeric);
                }
                None => {
                    row.push(None);
                    missing_columns.push(column.clone());
                }
            }
        }

        missing_columns.sort();
        empty_columns.sort();
        Ok(Reconciled {
            row,
            missing_columns,
            empty_columns,
        })
    }
}

/// A record projected onto the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// One slot per schema column, in schema order.
    pub row: Vec<Option<f64>>,
    /// Schema columns the record did not supply.
    pub missing_columns: Vec<String>,
    /// Schema columns the record supplied without a value (blank, NaN, null).
    pub empty_columns: Vec<String>,
}

impl Reconciled {
    /// True when at least one cell will be filled by the imputer.
    pub fn needs_imputation(&self) -> bool {
        !self.missing_columns.is_empty() || !self.empty_columns.is_empty()
    }

    pub fn into_matrix(self) -> Array2<Option<f64>> {
        Array2::row_vector(self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["a".into(), "b".into(), "c".into()]).unwrap()
    }

    #[test]
    fn from_cell_recognises_missing_tokens() {
        assert_eq!(FieldValue::from_cell("  "), FieldValue::Missing);
        assert_eq!(FieldValue::from_cell("NaN"), FieldValue::Missing);
        assert_eq!(FieldValue::from_cell("null"), FieldValue::Missing);
        assert_eq!(FieldValue::from_cell(" 3.5 "), FieldValue::Number(3.5));
        assert_eq!(FieldValue::from_cell("CONFIRMED"), FieldValue::Text("CONFIRMED".into()));
    }

    #[test]
    fn numeric_text_is_coerced() {
        assert_eq!(FieldValue::from("1e3").to_numeric(), Ok(Some(1000.0)));
        assert_eq!(FieldValue::from("").to_numeric(), Ok(None));
        assert!(FieldValue::from("abc").to_numeric().is_err());
        assert!(FieldValue::Number(f64::INFINITY).to_numeric().is_err());
        assert_eq!(FieldValue::Number(f64::NAN).to_numeric(), Ok(None));
    }

    #[test]
    fn schema_rejects_duplicates_and_empty() {
        assert!(FeatureSchema::new(vec![]).is_err());
        let err = FeatureSchema::new(vec!["x".into(), "x".into()]).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn reconcile_handles_extra_missing_and_reordered_columns() {
        let record: CandidateRecord =
            vec![("c", 3.0), ("extra", 99.0), ("a", 1.0)].into_iter().collect();
        let rec = schema().reconcile(&record).unwrap();
        assert_eq!(rec.row, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(rec.missing_columns, vec!["b".to_string()]);
        assert!(rec.empty_columns.is_empty());
        assert!(rec.needs_imputation());
    }

    #[test]
    fn present_but_empty_values_are_reported_separately() {
        let record = CandidateRecord::new()
            .with("a", 1.0)
            .with("b", FieldValue::Missing)
            .with("c", f64::NAN);
        let rec = schema().reconcile(&record).unwrap();
        assert_eq!(rec.row, vec![Some(1.0), None, None]);
        assert!(rec.missing_columns.is_empty());
        assert_eq!(rec.empty_columns, vec!["b", "c"]);
    }

    #[test]
    fn complete_record_needs_no_imputation() {
        let record = CandidateRecord::new().with("a", 1.0).with("b", 2.0).with("c", 3.0);
        assert!(!schema().reconcile(&record).unwrap().needs_imputation());
    }

    #[test]
    fn missing_columns_are_sorted_by_name() {
        let schema = FeatureSchema::new(vec!["z".into(), "m".into(), "a".into()]).unwrap();
        let rec = schema.reconcile(&CandidateRecord::new()).unwrap();
        assert_eq!(rec.missing_columns, vec!["a", "m", "z"]);
    }

    #[test]
    fn non_numeric_value_fails_reconciliation() {
        let record = CandidateRecord::new().with("a", "bright").with("b", 1.0).with("c", 1.0);
        let err = schema().reconcile(&record).unwrap_err();
        assert_eq!(err.stage, Stage::Reconciliation);
        assert!(err.message.contains("'a'"));
    }

    #[test]
    fn record_deserializes_from_json_object() {
        let record: CandidateRecord =
            serde_json::from_str(r#"{"a": 1.5, "b": null, "c": "2"}"#).unwrap();
        assert_eq!(record.get("a"), Some(&FieldValue::Number(1.5)));
        assert_eq!(record.get("b"), Some(&FieldValue::Missing));
        assert_eq!(record.get("c"), Some(&FieldValue::Text("2".into())));
    }
}
