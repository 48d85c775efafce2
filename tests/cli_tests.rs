mod support;

use std::ffi::OsStr;
use std::process::Command;

use colprofile::output::formatter::{REPORT_FILE, SCALED_FILE, SUMMARY_FILE, USAGE_FILE};
use colprofile::scoring::aggregator::ColumnSummaryRow;

use support::{fixture_dir, fixture_history, unique_temp_dir};

fn run_cli(args: &[&OsStr]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_colprofile"))
        .args(args)
        .output()
        .expect("should run colprofile binary")
}

#[test]
fn cli_publishes_identical_outputs_on_rerun() {
    let temp = unique_temp_dir("colprofile_cli_rerun");
    let state_dir = temp.join("state");
    let output_dir = temp.join("out");
    let history = fixture_history("sample_corpus");
    let config = fixture_dir("sample_corpus").join("config.json");

    let args: [&OsStr; 7] = [
        history.as_os_str(),
        "--config".as_ref(),
        config.as_os_str(),
        "--state-dir".as_ref(),
        state_dir.as_os_str(),
        "--output-dir".as_ref(),
        output_dir.as_os_str(),
    ];

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let output = run_cli(&args);
        assert!(
            output.status.success(),
            "colprofile failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let files: Vec<Vec<u8>> = [USAGE_FILE, SUMMARY_FILE, SCALED_FILE, REPORT_FILE]
            .iter()
            .map(|name| {
                std::fs::read(output_dir.join(name))
                    .unwrap_or_else(|e| panic!("failed to read {name}: {e}"))
            })
            .collect();
        snapshots.push(files);
    }
    assert_eq!(snapshots[0], snapshots[1]);

    let summary: Vec<ColumnSummaryRow> =
        serde_json::from_slice(&snapshots[0][1]).expect("summary should be JSON");
    let region = summary
        .iter()
        .find(|row| row.table == "customers" && row.column == "region")
        .expect("customers.region should be published");
    assert_eq!(region.total_duration_weight, 25.0);
    assert!(state_dir.join("query_history.jsonl").exists());
    assert!(state_dir.join("parsed_queries.json").exists());
}

#[test]
fn cli_fetch_failure_keeps_previous_outputs() {
    let temp = unique_temp_dir("colprofile_cli_fetch");
    let state_dir = temp.join("state");
    let output_dir = temp.join("out");
    let history = fixture_history("sample_corpus");

    let first = run_cli(&[
        history.as_os_str(),
        "--state-dir".as_ref(),
        state_dir.as_os_str(),
        "--output-dir".as_ref(),
        output_dir.as_os_str(),
    ]);
    assert!(first.status.success());
    let published = std::fs::read(output_dir.join(SUMMARY_FILE)).expect("summary should exist");
    let stored = std::fs::read(state_dir.join("query_history.jsonl")).expect("history should exist");

    let broken = temp.join("broken.jsonl");
    std::fs::write(
        &broken,
        concat!(
            r#"{"query_id":"n1","query_text":"SELECT * FROM fresh WHERE k = 1","status":"FINISHED","statement_type":"SELECT","duration":1.0}"#,
            "\n",
            r#"{"query_id": 42}"#,
            "\n"
        ),
    )
    .expect("should write broken history");

    let second = run_cli(&[
        broken.as_os_str(),
        "--state-dir".as_ref(),
        state_dir.as_os_str(),
        "--output-dir".as_ref(),
        output_dir.as_os_str(),
    ]);
    assert_eq!(second.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(
        stderr.contains("failed to fetch query history"),
        "unexpected stderr: {stderr}"
    );

    assert_eq!(
        std::fs::read(output_dir.join(SUMMARY_FILE)).expect("summary should still exist"),
        published
    );
    assert_eq!(
        std::fs::read(state_dir.join("query_history.jsonl")).expect("history should still exist"),
        stored
    );
}

#[test]
fn cli_rejects_unknown_dialect() {
    let output = run_cli(&["--dialect".as_ref(), "oracle9".as_ref()]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid SQL dialect: oracle9"), "got: {stderr}");
}
