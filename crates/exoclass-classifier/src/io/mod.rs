pub mod candidate_csv;

pub use candidate_csv::{
    read_candidate_csv, read_candidate_csv_with_config, read_candidate_records_from_reader,
    CandidateReaderConfig,
};
