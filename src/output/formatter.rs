use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::info;

use crate::error::ProfileError;
use crate::output::report;
use crate::profiler::pipeline::ProfileOutput;

/// Per-query usage rows.
pub const USAGE_FILE: &str = "column_usage.json";
/// Column summary table.
pub const SUMMARY_FILE: &str = "column_summary.json";
/// Scaled column summary table.
pub const SCALED_FILE: &str = "scaled_column_summary.json";
/// Markdown report.
pub const REPORT_FILE: &str = "profile_report.md";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Replace `path` with `contents` atomically.
///
/// The data goes to a sibling temporary file first and is renamed over the
/// target, so readers see either the old file or the new one. Temporary
/// names are unique per process and call, so concurrent writers never share
/// one.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), ProfileError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ProfileError::Config(format!("invalid output path: {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = std::fs::File::create_new(&tmp_path)
        .and_then(|mut file| {
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        })
        .map_err(|e| ProfileError::io(&tmp_path, e))
        .and_then(|()| std::fs::rename(&tmp_path, path).map_err(|e| ProfileError::io(path, e)));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn to_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<String, ProfileError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|e| ProfileError::json(path, e))?;
    json.push('\n');
    Ok(json)
}

/// Write all output files to `output_dir`.
///
/// Every document is rendered before the first file is replaced; a
/// rendering failure leaves previously published files untouched.
pub fn publish(output_dir: &Path, output: &ProfileOutput) -> Result<(), ProfileError> {
    std::fs::create_dir_all(output_dir).map_err(|e| ProfileError::io(output_dir, e))?;

    let usage_path = output_dir.join(USAGE_FILE);
    let summary_path = output_dir.join(SUMMARY_FILE);
    let scaled_path = output_dir.join(SCALED_FILE);
    let report_path = output_dir.join(REPORT_FILE);

    let documents = [
        (to_json(&usage_path, &output.usage)?, usage_path),
        (to_json(&summary_path, &output.summary)?, summary_path),
        (to_json(&scaled_path, &output.scaled)?, scaled_path),
        (report::build_report(output), report_path),
    ];
    for (contents, path) in &documents {
        write_atomic(path, contents)?;
    }

    info!(
        dir = %output_dir.display(),
        columns = output.summary.len(),
        "published column profile"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::aggregator::ColumnSummaryRow;
    use crate::scoring::normalizer::normalize;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_path(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}_{nanos}"))
    }

    fn output() -> ProfileOutput {
        let summary = vec![ColumnSummaryRow {
            table: "orders".to_string(),
            column: "cust_id".to_string(),
            is_join_any: true,
            is_filter_any: false,
            is_group_any: false,
            join_query_count: 1,
            filter_query_count: 0,
            group_query_count: 0,
            distinct_query_count: 1,
            total_duration_weight: 20.0,
            avg_duration: 10.0,
            total_occurrences: 0,
            avg_occurrences: 0.0,
        }];
        ProfileOutput {
            scaled: normalize(summary.clone()),
            summary,
            ..ProfileOutput::default()
        }
    }

    #[test]
    fn publish_reports_directory_creation_errors() {
        let path = unique_path("colprofile_formatter_file");
        std::fs::write(&path, "not a directory").expect("should create marker file");

        let err = publish(&path, &output()).expect_err("directory creation should fail");
        assert!(matches!(err, ProfileError::Io { .. }));
    }

    #[test]
    fn publish_writes_all_artifacts_on_success() {
        let dir = unique_path("colprofile_formatter_ok");
        publish(&dir, &output()).expect("publish should succeed");

        let summary: Vec<ColumnSummaryRow> = serde_json::from_str(
            &std::fs::read_to_string(dir.join(SUMMARY_FILE)).expect("summary should exist"),
        )
        .expect("summary should be valid JSON");
        assert_eq!(summary, output().summary);

        let scaled = std::fs::read_to_string(dir.join(SCALED_FILE)).expect("scaled should exist");
        assert!(scaled.contains("\"total_duration_weight_scaled\": 0.0"));
        let usage = std::fs::read_to_string(dir.join(USAGE_FILE)).expect("usage should exist");
        assert_eq!(usage, "[]\n");
        let report = std::fs::read_to_string(dir.join(REPORT_FILE)).expect("report should exist");
        assert!(report.starts_with("# Column Usage Report"));

        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .expect("dir should list")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn write_atomic_replaces_existing_content() {
        let dir = unique_path("colprofile_formatter_atomic");
        std::fs::create_dir_all(&dir).expect("should create dir");
        let path = dir.join("file.json");
        write_atomic(&path, "old").expect("first write");
        write_atomic(&path, "new").expect("second write");
        assert_eq!(std::fs::read_to_string(&path).expect("readable"), "new");
    }

    #[test]
    fn concurrent_writers_to_one_path_all_succeed() {
        let dir = unique_path("colprofile_formatter_concurrent");
        std::fs::create_dir_all(&dir).expect("should create dir");
        let path = dir.join("shared.json");
        let bodies: Vec<String> = (0..8).map(|i| format!("writer {i}\n").repeat(512)).collect();

        let target = path.as_path();
        std::thread::scope(|scope| {
            let handles: Vec<_> = bodies
                .iter()
                .map(|body| scope.spawn(move || write_atomic(target, body)))
                .collect();
            for handle in handles {
                handle
                    .join()
                    .expect("writer thread should not panic")
                    .expect("every write should succeed");
            }
        });

        let content = std::fs::read_to_string(&path).expect("readable");
        assert!(bodies.contains(&content));
        let entries = std::fs::read_dir(&dir).expect("dir should list").count();
        assert_eq!(entries, 1);
    }
}
