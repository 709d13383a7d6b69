//! Candidate table reader (CSV/TSV catalog exports).
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;

use crate::schema::{CandidateRecord, FieldValue};

/// Configuration for reading candidate tables.
#[derive(Debug, Clone, Default)]
pub struct CandidateReaderConfig {
    /// Field delimiter. When `None` it is picked from the file extension:
    /// tab for `.tsv`/`.tab`, comma otherwise.
    pub delimiter: Option<u8>,
    /// Stop after this many data rows.
    pub max_rows: Option<usize>,
}

/// Read every row of a candidate table.
pub fn read_candidate_csv<P: AsRef<Path>>(path: P) -> Result<Vec<CandidateRecord>> {
    read_candidate_csv_with_config(path, &CandidateReaderConfig::default())
}

/// Read a candidate table using a custom configuration.
pub fn read_candidate_csv_with_config<P: AsRef<Path>>(
    path: P,
    config: &CandidateReaderConfig,
) -> Result<Vec<CandidateRecord>> {
    let path = path.as_ref();
    let delimiter = config
        .delimiter
        .unwrap_or_else(|| delimiter_for_path(path));
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open candidate file: {}", path.display()))?;
    let records = read_records(file, delimiter, config.max_rows)
        .with_context(|| format!("Failed to read candidate file: {}", path.display()))?;
    log::debug!("Read {} candidate rows from {}", records.len(), path.display());
    Ok(records)
}

/// Read candidate rows from any reader. The first non-comment line is the
/// header.
pub fn read_candidate_records_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
) -> Result<Vec<CandidateRecord>> {
    read_records(reader, delimiter, None)
}

fn read_records<R: Read>(
    reader: R,
    delimiter: u8,
    max_rows: Option<usize>,
) -> Result<Vec<CandidateRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("Failed to read header row")?
        .clone();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(anyhow!("Candidate table has no header row"));
    }

    let mut records = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        if max_rows.map_or(false, |max| records.len() >= max) {
            break;
        }
        let row = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        records.push(to_record(&headers, &row));
    }
    Ok(records)
}

/// Pair header names with cells. A short row still carries every header
/// column, the trailing ones as empty cells; cells beyond the header are
/// dropped.
fn to_record(headers: &StringRecord, row: &StringRecord) -> CandidateRecord {
    headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(i, name)| (name, row.get(i).map_or(FieldValue::Missing, FieldValue::from_cell)))
        .collect()
}

fn delimiter_for_path(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}
