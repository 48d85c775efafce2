use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::classifier::references::ParsedQuery;
use crate::error::ProfileError;
use crate::history::record::{ExecutionKey, QueryRecord, RecordFilter};
use crate::history::source::read_records;
use crate::output::formatter::write_atomic;

/// Raw execution records accumulated across runs.
#[derive(Debug, Clone, Default)]
pub struct QueryHistory {
    records: Vec<QueryRecord>,
    seen: HashSet<ExecutionKey>,
}

/// What happened to a batch of incoming records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Records appended to the history.
    pub accepted: usize,
    /// Records dropped because their statement type is not profiled.
    pub skipped_statement_type: usize,
    /// Records dropped as re-deliveries of an execution already held.
    pub duplicates: usize,
}

impl QueryHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// History holding exactly `records`, as previously persisted.
    pub fn from_records(records: Vec<QueryRecord>) -> Self {
        let seen = records.iter().map(QueryRecord::execution_key).collect();
        Self { records, seen }
    }

    /// Append incoming records.
    ///
    /// Only statement types admitted by `filter` are kept, and an execution
    /// already held (see [`QueryRecord::execution_key`]) is not appended
    /// again.
    pub fn ingest<I>(&mut self, records: I, filter: &RecordFilter) -> IngestSummary
    where
        I: IntoIterator<Item = QueryRecord>,
    {
        let mut summary = IngestSummary::default();
        for record in records {
            if !filter.admits_statement(&record) {
                summary.skipped_statement_type += 1;
                continue;
            }
            if !self.seen.insert(record.execution_key()) {
                summary.duplicates += 1;
                continue;
            }
            self.records.push(record);
            summary.accepted += 1;
        }
        summary
    }

    /// Every held record, in ingestion order.
    pub fn records(&self) -> &[QueryRecord] {
        &self.records
    }

    /// Number of held records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record is held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct `(query_id, query_text)` pairs sorted by query id.
    ///
    /// When executions of one query id disagree on text, the latest ingested
    /// text wins.
    pub fn distinct_queries(&self) -> Vec<(String, String)> {
        let mut latest: BTreeMap<&str, &str> = BTreeMap::new();
        for record in &self.records {
            latest.insert(&record.query_id, &record.query_text);
        }
        latest
            .into_iter()
            .map(|(id, text)| (id.to_string(), text.to_string()))
            .collect()
    }

    fn clear(&mut self) {
        self.records.clear();
        self.seen.clear();
    }
}

/// Parsed queries keyed by query id, with upsert semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQueryStore {
    queries: BTreeMap<String, ParsedQuery>,
}

impl ParsedQueryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `parsed.query_id`, returning the
    /// previous entry.
    pub fn upsert(&mut self, parsed: ParsedQuery) -> Option<ParsedQuery> {
        self.queries.insert(parsed.query_id.clone(), parsed)
    }

    /// Entry for a query id.
    pub fn get(&self, query_id: &str) -> Option<&ParsedQuery> {
        self.queries.get(query_id)
    }

    /// True when the stored entry was parsed from exactly `query_text` by a
    /// backend with fingerprint `parsed_with`.
    pub fn is_current(&self, query_id: &str, query_text: &str, parsed_with: &str) -> bool {
        self.get(query_id).is_some_and(|parsed| {
            parsed.query_text == query_text && parsed.parsed_with == parsed_with
        })
    }

    /// Entries sorted by query id.
    pub fn values(&self) -> impl Iterator<Item = &ParsedQuery> {
        self.queries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    fn clear(&mut self) {
        self.queries.clear();
    }
}

impl FromIterator<ParsedQuery> for ParsedQueryStore {
    fn from_iter<T: IntoIterator<Item = ParsedQuery>>(iter: T) -> Self {
        let mut store = Self::new();
        for parsed in iter {
            store.upsert(parsed);
        }
        store
    }
}

const HISTORY_FILE: &str = "query_history.jsonl";
const PARSED_FILE: &str = "parsed_queries.json";

/// File-backed state of the profiler: raw history and parsed queries.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
    /// Raw execution records.
    pub history: QueryHistory,
    /// Parsed queries.
    pub parsed: ParsedQueryStore,
}

impl ProfileStore {
    /// Load the store from `dir`; missing files mean an empty store.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let dir = dir.into();

        let history_path = dir.join(HISTORY_FILE);
        let history = if history_path.exists() {
            QueryHistory::from_records(read_records(&history_path)?.collect::<Result<_, _>>()?)
        } else {
            QueryHistory::new()
        };

        let parsed_path = dir.join(PARSED_FILE);
        let parsed = if parsed_path.exists() {
            let content = std::fs::read_to_string(&parsed_path)
                .map_err(|e| ProfileError::io(&parsed_path, e))?;
            let queries: Vec<ParsedQuery> =
                serde_json::from_str(&content).map_err(|e| ProfileError::json(&parsed_path, e))?;
            queries.into_iter().collect()
        } else {
            ParsedQueryStore::new()
        };

        debug!(
            dir = %dir.display(),
            records = history.len(),
            parsed = parsed.len(),
            "opened profile store"
        );
        Ok(Self {
            dir,
            history,
            parsed,
        })
    }

    /// Directory the store lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist both files, each replaced atomically.
    pub fn save(&self) -> Result<(), ProfileError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ProfileError::io(&self.dir, e))?;

        let history_path = self.dir.join(HISTORY_FILE);
        let mut lines = String::new();
        for record in self.history.records() {
            let line =
                serde_json::to_string(record).map_err(|e| ProfileError::json(&history_path, e))?;
            lines.push_str(&line);
            lines.push('\n');
        }
        write_atomic(&history_path, &lines)?;

        let parsed_path = self.dir.join(PARSED_FILE);
        let queries: Vec<&ParsedQuery> = self.parsed.values().collect();
        let json = serde_json::to_string_pretty(&queries)
            .map_err(|e| ProfileError::json(&parsed_path, e))?;
        write_atomic(&parsed_path, &json)
    }

    /// Drop every record and parsed query. Takes effect on disk at the next
    /// [`save`](Self::save).
    pub fn reset(&mut self) {
        info!(dir = %self.dir.display(), "resetting profile store");
        self.history.clear();
        self.parsed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::record::QueryStatus;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_path(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}_{nanos}"))
    }

    fn record(id: &str, text: &str, kind: &str, start: Option<f64>) -> QueryRecord {
        QueryRecord {
            query_id: id.to_string(),
            query_text: text.to_string(),
            status: QueryStatus::Finished,
            statement_type: kind.to_string(),
            duration: 1.0,
            rows_produced: 1.0,
            query_start_time_ms: start,
            query_end_time_ms: None,
        }
    }

    fn parsed(id: &str, text: &str) -> ParsedQuery {
        ParsedQuery {
            query_id: id.to_string(),
            query_text: text.to_string(),
            parsed_with: String::new(),
            references: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn ingest_filters_statement_types_and_redelivered_executions() {
        let mut history = QueryHistory::new();
        let filter = RecordFilter::default();
        let summary = history.ingest(
            vec![
                record("q1", "SELECT 1", "SELECT", Some(1.0)),
                record("q1", "SELECT 1", "SELECT", Some(1.0)),
                record("q1", "SELECT 1", "SELECT", Some(2.0)),
                record("q2", "INSERT INTO t VALUES (1)", "INSERT", Some(1.0)),
                record("q3", "SELECT 3", "SELECT", None),
                record("q3", "SELECT 3", "SELECT", None),
            ],
            &filter,
        );

        assert_eq!(
            summary,
            IngestSummary {
                accepted: 3,
                skipped_statement_type: 1,
                duplicates: 2,
            }
        );
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn reingesting_records_without_start_time_adds_nothing() {
        let batch = vec![
            record("q1", "SELECT 1", "SELECT", None),
            record("q2", "SELECT 2", "SELECT", None),
        ];
        let mut history = QueryHistory::new();
        history.ingest(batch.clone(), &RecordFilter::default());

        let mut reloaded = QueryHistory::from_records(history.records().to_vec());
        let again = reloaded.ingest(batch, &RecordFilter::default());
        assert_eq!(again.accepted, 0);
        assert_eq!(again.duplicates, 2);
        assert_eq!(reloaded.len(), 2);

        let slower = QueryRecord {
            duration: 7.0,
            ..record("q1", "SELECT 1", "SELECT", None)
        };
        assert_eq!(reloaded.ingest(vec![slower], &RecordFilter::default()).accepted, 1);
    }

    #[test]
    fn distinct_queries_keeps_latest_text_per_id() {
        let history = QueryHistory::from_records(vec![
            record("b", "SELECT 2", "SELECT", None),
            record("a", "SELECT old", "SELECT", None),
            record("a", "SELECT new", "SELECT", None),
        ]);
        assert_eq!(
            history.distinct_queries(),
            vec![
                ("a".to_string(), "SELECT new".to_string()),
                ("b".to_string(), "SELECT 2".to_string()),
            ]
        );
    }

    #[test]
    fn upsert_overwrites_by_query_id() {
        let mut store = ParsedQueryStore::new();
        assert!(store.upsert(parsed("q1", "SELECT 1")).is_none());
        let previous = store.upsert(parsed("q1", "SELECT 2")).expect("previous entry");

        assert_eq!(previous.query_text, "SELECT 1");
        assert_eq!(store.len(), 1);
        assert!(store.is_current("q1", "SELECT 2", ""));
        assert!(!store.is_current("q1", "SELECT 1", ""));
        assert!(!store.is_current("q2", "SELECT 2", ""));
        assert!(!store.is_current("q1", "SELECT 2", "sqlparser:postgres"));
    }

    #[test]
    fn profile_store_round_trips_and_resets() {
        let dir = unique_path("colprofile_store");
        let mut store = ProfileStore::open(&dir).expect("missing dir opens empty");
        assert!(store.history.is_empty());

        store.history.ingest(
            vec![record("q1", "SELECT 1", "SELECT", Some(5.0))],
            &RecordFilter::default(),
        );
        store.parsed.upsert(parsed("q1", "SELECT 1"));
        store.save().expect("save should succeed");

        let mut reopened = ProfileStore::open(&dir).expect("store should reopen");
        assert_eq!(reopened.history.records(), store.history.records());
        assert_eq!(reopened.parsed, store.parsed);

        let again = reopened.history.ingest(
            vec![record("q1", "SELECT 1", "SELECT", Some(5.0))],
            &RecordFilter::default(),
        );
        assert_eq!(again.duplicates, 1);

        reopened.reset();
        reopened.save().expect("save after reset should succeed");
        let emptied = ProfileStore::open(&dir).expect("store should reopen");
        assert!(emptied.history.is_empty());
        assert!(emptied.parsed.is_empty());
    }
}
