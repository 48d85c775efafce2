use serde::{Deserialize, Serialize};
use std::fmt;

/// Final state of one query execution, as reported by the query-history
/// service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    /// Waiting for a warehouse.
    Queued,
    /// Still executing.
    Running,
    /// Cancelled by the user or the system.
    Canceled,
    /// Failed with an error.
    Failed,
    /// Completed successfully.
    Finished,
    /// Any status this crate does not know about.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryStatus::Queued => "QUEUED",
            QueryStatus::Running => "RUNNING",
            QueryStatus::Canceled => "CANCELED",
            QueryStatus::Failed => "FAILED",
            QueryStatus::Finished => "FINISHED",
            QueryStatus::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// One execution of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Identifier shared by every execution of the same query.
    pub query_id: String,
    /// SQL text as submitted.
    pub query_text: String,
    /// Final execution status.
    pub status: QueryStatus,
    /// Statement kind (`SELECT`, `INSERT`, ...).
    #[serde(default)]
    pub statement_type: String,
    /// Wall-clock duration.
    #[serde(default)]
    pub duration: f64,
    /// Rows returned.
    #[serde(default)]
    pub rows_produced: f64,
    /// Execution start, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_start_time_ms: Option<f64>,
    /// Execution end, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_end_time_ms: Option<f64>,
}

/// Identity of one execution. Two records with equal keys are the same
/// execution delivered twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExecutionKey {
    /// Query id and start time.
    Started {
        /// Query id.
        query_id: String,
        /// Bits of the start time.
        start: u64,
    },
    /// Every reported field, for records without a start time.
    Content {
        /// Query id.
        query_id: String,
        /// SQL text.
        query_text: String,
        /// Final status.
        status: QueryStatus,
        /// Statement kind.
        statement_type: String,
        /// Bits of the duration.
        duration: u64,
        /// Bits of the rows produced.
        rows_produced: u64,
        /// Bits of the end time, if any.
        end: Option<u64>,
    },
}

impl QueryRecord {
    /// Key identifying this execution.
    ///
    /// Records with a start time are keyed by (query id, start). Records
    /// without one fall back to their full content, so an identical record
    /// delivered again is still recognised.
    pub fn execution_key(&self) -> ExecutionKey {
        match self.query_start_time_ms {
            Some(start) => ExecutionKey::Started {
                query_id: self.query_id.clone(),
                start: start.to_bits(),
            },
            None => ExecutionKey::Content {
                query_id: self.query_id.clone(),
                query_text: self.query_text.clone(),
                status: self.status,
                statement_type: self.statement_type.clone(),
                duration: self.duration.to_bits(),
                rows_produced: self.rows_produced.to_bits(),
                end: self.query_end_time_ms.map(f64::to_bits),
            },
        }
    }
}

/// Which records count toward ingestion and execution statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    /// Statuses whose executions are summarized.
    pub statuses: Vec<QueryStatus>,
    /// Statement types that are ingested and summarized (case-insensitive).
    pub statement_types: Vec<String>,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            statuses: vec![QueryStatus::Finished, QueryStatus::Canceled],
            statement_types: vec!["SELECT".to_string()],
        }
    }
}

impl RecordFilter {
    /// Whether the record's statement type is profiled.
    pub fn admits_statement(&self, record: &QueryRecord) -> bool {
        self.statement_types
            .iter()
            .any(|kind| kind.eq_ignore_ascii_case(record.statement_type.trim()))
    }

    /// Whether the record contributes to execution statistics.
    pub fn admits(&self, record: &QueryRecord) -> bool {
        self.statuses.contains(&record.status) && self.admits_statement(record)
    }
}
