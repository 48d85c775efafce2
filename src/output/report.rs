use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Write};

use crate::profiler::pipeline::ProfileOutput;
use crate::scoring::normalizer::ScaledColumnSummaryRow;

/// Build a markdown report ranking each table's columns.
pub fn build_report(output: &ProfileOutput) -> String {
    let mut report = String::new();
    // Writing into a String cannot fail.
    let _ = render_report(&mut report, output);
    report
}

/// Render the report into any formatter sink.
pub fn render_report<W: Write>(out: &mut W, output: &ProfileOutput) -> fmt::Result {
    let mut tables: BTreeMap<&str, Vec<&ScaledColumnSummaryRow>> = BTreeMap::new();
    for row in &output.scaled {
        tables.entry(row.summary.table.as_str()).or_default().push(row);
    }

    writeln!(out, "# Column Usage Report")?;
    writeln!(out)?;
    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "- Tables: {}", tables.len())?;
    writeln!(out, "- Columns: {}", output.scaled.len())?;
    writeln!(out, "- Parse failures: {}", output.parse_failures.len())?;

    for (table, mut columns) in tables {
        columns.sort_by(|a, b| rank_order(a, b));

        writeln!(out)?;
        writeln!(out, "## {table}")?;
        writeln!(out)?;
        writeln!(
            out,
            "| Rank | Column | Usage | Queries | Duration Weight | Weight Score | Query Score |"
        )?;
        writeln!(
            out,
            "|------|--------|-------|---------|-----------------|--------------|-------------|"
        )?;
        for (rank, row) in columns.iter().enumerate() {
            writeln!(
                out,
                "| {} | {} | {} | {} | {:.1} | {:.3} | {:.3} |",
                rank + 1,
                row.summary.column,
                usage_label(row),
                row.summary.distinct_query_count,
                row.summary.total_duration_weight,
                row.total_duration_weight_scaled,
                row.distinct_query_count_scaled,
            )?;
        }
    }

    if !output.parse_failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Parse Failures")?;
        writeln!(out)?;
        for failure in &output.parse_failures {
            writeln!(out, "- **{}**: {}", failure.query_id, failure.error)?;
        }
    }

    Ok(())
}

fn rank_order(a: &ScaledColumnSummaryRow, b: &ScaledColumnSummaryRow) -> Ordering {
    b.total_duration_weight_scaled
        .total_cmp(&a.total_duration_weight_scaled)
        .then_with(|| {
            b.distinct_query_count_scaled
                .total_cmp(&a.distinct_query_count_scaled)
        })
        .then_with(|| a.summary.column.cmp(&b.summary.column))
}

fn usage_label(row: &ScaledColumnSummaryRow) -> String {
    let summary = &row.summary;
    let labels: Vec<&str> = [
        (summary.is_join_any, "join"),
        (summary.is_filter_any, "filter"),
        (summary.is_group_any, "group"),
    ]
    .into_iter()
    .filter_map(|(set, label)| set.then_some(label))
    .collect();
    labels.join(", ")
}
