mod support;

use colprofile::output::report::build_report;

use support::{END_TO_END_SQL, profile, record};

#[test]
fn report_ranks_columns_within_each_table() {
    let output = profile(vec![
        record("q1", END_TO_END_SQL, 8.0, 1.0),
        record("q1", END_TO_END_SQL, 12.0, 2.0),
        record(
            "q2",
            "SELECT * FROM customers WHERE region = 'EU' AND signup_date > '2024-01-01'",
            5.0,
            3.0,
        ),
    ]);

    insta::assert_snapshot!(build_report(&output).trim_end(), @r"
    # Column Usage Report

    ## Summary

    - Tables: 2
    - Columns: 5
    - Parse failures: 0

    ## customers

    | Rank | Column | Usage | Queries | Duration Weight | Weight Score | Query Score |
    |------|--------|-------|---------|-----------------|--------------|-------------|
    | 1 | region | filter | 2 | 25.0 | 1.000 | 1.000 |
    | 2 | id | join | 1 | 20.0 | 0.750 | 0.000 |
    | 3 | signup_date | filter | 1 | 5.0 | 0.000 | 0.000 |

    ## orders

    | Rank | Column | Usage | Queries | Duration Weight | Weight Score | Query Score |
    |------|--------|-------|---------|-----------------|--------------|-------------|
    | 1 | cust_id | join | 1 | 20.0 | 0.000 | 0.000 |
    | 2 | x | group | 1 | 20.0 | 0.000 | 0.000 |
    ");
}

#[test]
fn report_lists_parse_failures() {
    let output = profile(vec![
        record("ok", "SELECT * FROM t WHERE a = 1", 1.0, 1.0),
        record("blank", "  ", 1.0, 2.0),
    ]);
    let report = build_report(&output);

    assert!(report.contains("- Parse failures: 1"));
    assert!(report.contains("## Parse Failures"));
    assert!(report.contains("- **blank**: empty query text"));
}
