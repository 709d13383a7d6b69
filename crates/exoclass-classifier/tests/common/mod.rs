#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use exoclass_classifier::CandidateRecord;
use tempfile::TempDir;

pub const COLUMNS: [&str; 6] = ["score", "period", "radius", "duration", "depth", "temp"];

/// Training medians stored in the fixture imputer, in schema order.
pub const MEDIANS: [f64; 6] = [0.5, 10.0, 2.0, 3.5, 500.0, 800.0];

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/artifacts")
}

/// Copy the fixture bundle into a fresh temporary directory so a test can
/// delete or rewrite individual files.
pub fn copy_fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for entry in fs::read_dir(fixture_dir()).expect("fixture dir missing") {
        let entry = entry.expect("failed to read fixture entry");
        fs::copy(entry.path(), dir.path().join(entry.file_name()))
            .expect("failed to copy fixture file");
    }
    dir
}

/// The record from the all-columns-present scenario.
pub fn strong_candidate() -> CandidateRecord {
    CandidateRecord::new()
        .with("score", 0.98)
        .with("period", 5.0)
        .with("radius", 1.5)
        .with("duration", 3.0)
        .with("depth", 100.0)
        .with("temp", 300.0)
}
