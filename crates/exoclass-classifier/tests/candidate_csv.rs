use std::fs;

use exoclass_classifier::io::{read_candidate_csv, read_candidate_csv_with_config, CandidateReaderConfig};
use exoclass_classifier::FieldValue;

const CATALOG: &str = "\
# This file was produced by the exoplanet archive
# COLUMN score: disposition score
kepoi_name,score,period,radius,duration,depth,temp
K00752.01,0.98,9.488,2.26,2.957,615.8,793
K00752.02,0.0,54.418,2.83,4.507,874.8,443
K00753.01,,19.899,14.6,1.782,10829,638
";

#[test]
fn reads_archive_export_with_preamble() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("koi.csv");
    fs::write(&path, CATALOG).unwrap();

    let records = read_candidate_csv(&path).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].get("kepoi_name"), Some(&FieldValue::Text("K00752.01".into())));
    assert_eq!(records[1].get("temp"), Some(&FieldValue::Number(443.0)));
    assert_eq!(records[2].get("score"), Some(&FieldValue::Missing));
}

#[test]
fn tsv_extension_switches_to_tabs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("koi.tsv");
    fs::write(&path, CATALOG.replace(',', "\t")).unwrap();

    let records = read_candidate_csv(&path).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].get("period"), Some(&FieldValue::Number(9.488)));
}

#[test]
fn max_rows_limits_the_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("koi.csv");
    fs::write(&path, CATALOG).unwrap();

    let config = CandidateReaderConfig {
        max_rows: Some(2),
        ..Default::default()
    };
    assert_eq!(read_candidate_csv_with_config(&path, &config).unwrap().len(), 2);
}

#[test]
fn truncated_row_reads_like_blank_trailing_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("koi.csv");
    fs::write(
        &path,
        "kepoi_name,score,temp\nK00752.01,0.98\nK00752.01,0.98,\n",
    )
    .unwrap();

    let records = read_candidate_csv(&path).unwrap();
    assert_eq!(records[0].get("temp"), Some(&FieldValue::Missing));
    assert_eq!(records[0], records[1]);
}

#[test]
fn missing_file_error_names_the_path() {
    let err = read_candidate_csv("/nonexistent/koi.csv").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/koi.csv"));
}
