#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use colprofile::error::SourceError;
use colprofile::history::record::{QueryRecord, QueryStatus};
use colprofile::history::source::read_records;
use colprofile::history::store::ProfileStore;
use colprofile::parser::dialect::DialectKind;
use colprofile::profiler::config::ProfileConfig;
use colprofile::profiler::pipeline::{ProfileOutput, Profiler};

pub(crate) const END_TO_END_SQL: &str = "SELECT a.x FROM orders a JOIN customers b ON a.cust_id = b.id WHERE b.region = 'US' GROUP BY a.x";

pub(crate) fn fixture_dir(fixture: &str) -> PathBuf {
    PathBuf::from("tests/fixtures").join(fixture)
}

pub(crate) fn fixture_history(fixture: &str) -> PathBuf {
    fixture_dir(fixture).join("query_history.jsonl")
}

pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("should create temp dir");
    dir
}

pub(crate) fn record(id: &str, text: &str, duration: f64, start: f64) -> QueryRecord {
    QueryRecord {
        query_id: id.to_string(),
        query_text: text.to_string(),
        status: QueryStatus::Finished,
        statement_type: "SELECT".to_string(),
        duration,
        rows_produced: 1.0,
        query_start_time_ms: Some(start),
        query_end_time_ms: None,
    }
}

pub(crate) fn ok(records: Vec<QueryRecord>) -> Vec<Result<QueryRecord, SourceError>> {
    records.into_iter().map(Ok).collect()
}

pub(crate) fn profiler() -> Profiler {
    Profiler::new(ProfileConfig {
        dialect: DialectKind::Databricks,
        ..ProfileConfig::default()
    })
}

/// Run the default profiler over `records` against a fresh store.
pub(crate) fn profile(records: Vec<QueryRecord>) -> ProfileOutput {
    let mut store = ProfileStore::open(unique_temp_dir("colprofile_support"))
        .expect("fresh store should open");
    profiler()
        .run(&mut store, ok(records))
        .expect("profiling should succeed")
}

pub(crate) fn load_fixture_records(fixture: &str) -> Vec<QueryRecord> {
    read_records(&fixture_history(fixture))
        .expect("fixture history should open")
        .collect::<Result<_, _>>()
        .expect("fixture records should parse")
}
