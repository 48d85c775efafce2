use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::history::record::{QueryRecord, RecordFilter};

/// Per-query aggregate over all of its admitted executions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatisticsSummary {
    /// Query the executions belong to.
    pub query_id: String,
    /// Mean execution duration.
    pub average_duration: f64,
    /// Mean rows produced.
    pub average_rows_produced: f64,
    /// Number of admitted executions.
    pub run_count: u64,
    /// `average_duration * run_count`, the total time cost of the query.
    pub duration_weight: f64,
}

impl ExecutionStatisticsSummary {
    /// Summary from precomputed averages.
    pub fn new(query_id: impl Into<String>, average_duration: f64, run_count: u64) -> Self {
        Self {
            query_id: query_id.into(),
            average_duration,
            average_rows_produced: 0.0,
            run_count,
            duration_weight: average_duration * run_count as f64,
        }
    }
}

/// Execution statistics keyed by query id.
pub type StatisticsByQuery = BTreeMap<String, ExecutionStatisticsSummary>;

/// Recompute execution statistics from the whole record set.
///
/// Records rejected by `filter` are ignored; a query none of whose records
/// is admitted gets no entry.
pub fn summarize_executions<'a, I>(records: I, filter: &RecordFilter) -> StatisticsByQuery
where
    I: IntoIterator<Item = &'a QueryRecord>,
{
    #[derive(Default)]
    struct Totals {
        duration: f64,
        rows: f64,
        runs: u64,
    }

    let mut totals: BTreeMap<&str, Totals> = BTreeMap::new();
    for record in records.into_iter().filter(|r| filter.admits(r)) {
        let entry = totals.entry(record.query_id.as_str()).or_default();
        entry.duration += record.duration;
        entry.rows += record.rows_produced;
        entry.runs += 1;
    }

    totals
        .into_iter()
        .map(|(query_id, totals)| {
            let runs = totals.runs as f64;
            let average_duration = totals.duration / runs;
            let summary = ExecutionStatisticsSummary {
                query_id: query_id.to_string(),
                average_duration,
                average_rows_produced: totals.rows / runs,
                run_count: totals.runs,
                duration_weight: average_duration * runs,
            };
            (query_id.to_string(), summary)
        })
        .collect()
}
