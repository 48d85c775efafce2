use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::scoring::aggregator::ColumnSummaryRow;

/// A summary row with its metrics min-max scaled within its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledColumnSummaryRow {
    /// Unscaled rollup.
    #[serde(flatten)]
    pub summary: ColumnSummaryRow,
    /// Scaled `distinct_query_count`.
    pub distinct_query_count_scaled: f64,
    /// Scaled `total_duration_weight`.
    pub total_duration_weight_scaled: f64,
    /// Scaled `avg_duration`.
    pub avg_duration_scaled: f64,
    /// Scaled `total_occurrences`.
    pub total_occurrences_scaled: f64,
    /// Scaled `avg_occurrences`.
    pub avg_occurrences_scaled: f64,
}

/// Map every value to `[0, 1]` relative to the slice's min and max.
///
/// All zeros when min equals max, including the single-value case.
pub fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = max - min;
    values
        .iter()
        .map(|v| {
            if range > 0.0 && range.is_finite() {
                ((v - min) / range).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

fn scale_partition(rows: Vec<ColumnSummaryRow>) -> Vec<ScaledColumnSummaryRow> {
    let metric = |f: fn(&ColumnSummaryRow) -> f64| -> Vec<f64> {
        min_max_scale(&rows.iter().map(f).collect::<Vec<_>>())
    };
    let distinct = metric(|r| r.distinct_query_count as f64);
    let weight = metric(|r| r.total_duration_weight);
    let duration = metric(|r| r.avg_duration);
    let total_occ = metric(|r| r.total_occurrences as f64);
    let avg_occ = metric(|r| r.avg_occurrences);

    rows.into_iter()
        .enumerate()
        .map(|(i, summary)| ScaledColumnSummaryRow {
            summary,
            distinct_query_count_scaled: distinct[i],
            total_duration_weight_scaled: weight[i],
            avg_duration_scaled: duration[i],
            total_occurrences_scaled: total_occ[i],
            avg_occurrences_scaled: avg_occ[i],
        })
        .collect()
}

/// Scale the five usage metrics within each table's partition.
///
/// Partitions are scaled independently on the rayon pool. Every input row
/// appears once in the output, grouped by table in table order and in input
/// order within a table.
pub fn normalize(rows: Vec<ColumnSummaryRow>) -> Vec<ScaledColumnSummaryRow> {
    let mut partitions: BTreeMap<String, Vec<ColumnSummaryRow>> = BTreeMap::new();
    for row in rows {
        partitions.entry(row.table.clone()).or_default().push(row);
    }

    let partitions: Vec<Vec<ColumnSummaryRow>> = partitions.into_values().collect();
    partitions
        .into_par_iter()
        .map(scale_partition)
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}
