use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::references::{ColumnReference, ParsedQuery};
use crate::history::statistics::StatisticsByQuery;

/// One attributed reference of one executed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnUsageRow {
    /// Attributed table.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Query the reference comes from.
    pub query_id: String,
    /// Text of that query.
    pub query_text: String,
    /// Seen in a join condition.
    pub is_join: bool,
    /// Seen in a WHERE predicate.
    pub is_filter: bool,
    /// Seen in a GROUP BY key.
    pub is_group: bool,
    /// Textual occurrences of the column name in the query text, minus one.
    pub occurrence_count: u64,
    /// Total time cost of the query.
    pub duration_weight: f64,
    /// Mean execution duration of the query.
    pub average_duration: f64,
}

/// Corpus-wide rollup for one (table, column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummaryRow {
    /// Table.
    pub table: String,
    /// Column.
    pub column: String,
    /// Used as a join key by at least one query.
    pub is_join_any: bool,
    /// Used as a filter by at least one query.
    pub is_filter_any: bool,
    /// Used as a grouping key by at least one query.
    pub is_group_any: bool,
    /// Distinct queries using the column in a join.
    pub join_query_count: u64,
    /// Distinct queries using the column in a filter.
    pub filter_query_count: u64,
    /// Distinct queries using the column as a grouping key.
    pub group_query_count: u64,
    /// Distinct queries referencing the column at all.
    pub distinct_query_count: u64,
    /// Sum of the duration weights of those queries.
    pub total_duration_weight: f64,
    /// Mean of their average durations.
    pub avg_duration: f64,
    /// Sum of occurrence counts.
    pub total_occurrences: u64,
    /// Mean occurrence count.
    pub avg_occurrences: f64,
}

/// Occurrences of `column` in `query_text` beyond the first.
///
/// Case-sensitive, non-overlapping substring matches; a column name that is
/// a substring of another identifier is counted there too.
pub fn occurrence_count(query_text: &str, column: &str) -> u64 {
    if column.is_empty() {
        return 0;
    }
    let matches = query_text.matches(column).count() as u64;
    matches.saturating_sub(1)
}

/// Expand parsed queries into per-reference usage rows joined with their
/// execution statistics.
///
/// Queries with no statistics entry contribute nothing. Rows are sorted by
/// (table, column, query_id).
pub fn expand_usage<'a, I>(parsed: I, stats: &StatisticsByQuery) -> Vec<ColumnUsageRow>
where
    I: IntoIterator<Item = &'a ParsedQuery>,
{
    let mut rows = Vec::new();
    let mut unmatched = 0usize;

    for query in parsed {
        let Some(summary) = stats.get(&query.query_id) else {
            if !query.references.is_empty() {
                debug!(query_id = %query.query_id, "no execution statistics, dropping query");
            }
            unmatched += 1;
            continue;
        };

        for attributed in &query.references {
            let ColumnReference { table, column } = &attributed.reference;
            rows.push(ColumnUsageRow {
                table: table.clone(),
                column: column.clone(),
                query_id: query.query_id.clone(),
                query_text: query.query_text.clone(),
                is_join: attributed.usage.is_join,
                is_filter: attributed.usage.is_filter,
                is_group: attributed.usage.is_group,
                occurrence_count: occurrence_count(&query.query_text, column),
                duration_weight: summary.duration_weight,
                average_duration: summary.average_duration,
            });
        }
    }

    if unmatched > 0 {
        debug!(unmatched, "parsed queries without execution statistics");
    }

    rows.sort_by(|a, b| {
        (&a.table, &a.column, &a.query_id).cmp(&(&b.table, &b.column, &b.query_id))
    });
    rows
}

#[derive(Default)]
struct Rollup<'a> {
    queries: BTreeSet<&'a str>,
    join: BTreeSet<&'a str>,
    filter: BTreeSet<&'a str>,
    group: BTreeSet<&'a str>,
    rows: u64,
    total_duration_weight: f64,
    duration_sum: f64,
    total_occurrences: u64,
}

/// Group usage rows by (table, column).
///
/// Output is sorted by (table, column).
pub fn summarize_usage(rows: &[ColumnUsageRow]) -> Vec<ColumnSummaryRow> {
    let mut groups: BTreeMap<(&str, &str), Rollup<'_>> = BTreeMap::new();

    for row in rows {
        let rollup = groups
            .entry((row.table.as_str(), row.column.as_str()))
            .or_default();
        let query_id = row.query_id.as_str();
        rollup.queries.insert(query_id);
        if row.is_join {
            rollup.join.insert(query_id);
        }
        if row.is_filter {
            rollup.filter.insert(query_id);
        }
        if row.is_group {
            rollup.group.insert(query_id);
        }
        rollup.rows += 1;
        rollup.total_duration_weight += row.duration_weight;
        rollup.duration_sum += row.average_duration;
        rollup.total_occurrences += row.occurrence_count;
    }

    groups
        .into_iter()
        .map(|((table, column), rollup)| {
            let rows = rollup.rows as f64;
            ColumnSummaryRow {
                table: table.to_string(),
                column: column.to_string(),
                is_join_any: !rollup.join.is_empty(),
                is_filter_any: !rollup.filter.is_empty(),
                is_group_any: !rollup.group.is_empty(),
                join_query_count: rollup.join.len() as u64,
                filter_query_count: rollup.filter.len() as u64,
                group_query_count: rollup.group.len() as u64,
                distinct_query_count: rollup.queries.len() as u64,
                total_duration_weight: rollup.total_duration_weight,
                avg_duration: rollup.duration_sum / rows,
                total_occurrences: rollup.total_occurrences,
                avg_occurrences: rollup.total_occurrences as f64 / rows,
            }
        })
        .collect()
}

/// Full corpus rollup: [`expand_usage`] then [`summarize_usage`].
pub fn aggregate<'a, I>(parsed: I, stats: &StatisticsByQuery) -> Vec<ColumnSummaryRow>
where
    I: IntoIterator<Item = &'a ParsedQuery>,
{
    summarize_usage(&expand_usage(parsed, stats))
}
