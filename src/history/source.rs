use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::{Path, PathBuf};

use crate::error::ProfileError;
use crate::history::record::QueryRecord;

/// Pull-based reader over a query-history file.
///
/// Accepted layouts:
/// - JSON Lines, one record per line (streamed)
/// - a JSON array of records
/// - a query-history API page, `{"res": [...], "has_next_page": ...}`
pub struct RecordReader {
    path: PathBuf,
    pending: Option<QueryRecord>,
    lines: Option<Lines<BufReader<File>>>,
    line: usize,
    buffered: std::vec::IntoIter<QueryRecord>,
}

impl std::fmt::Debug for RecordReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("path", &self.path)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

/// Open a query-history file for reading.
pub fn read_records(path: &Path) -> Result<RecordReader, ProfileError> {
    let file = File::open(path).map_err(|e| ProfileError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut first = String::new();
    let mut line = 0usize;
    loop {
        first.clear();
        let read = reader
            .read_line(&mut first)
            .map_err(|e| ProfileError::io(path, e))?;
        if read == 0 {
            return Ok(RecordReader::buffered(path, Vec::new()));
        }
        line += 1;
        if !first.trim().is_empty() {
            break;
        }
    }

    let head = first.trim();
    if !head.starts_with('[') {
        if let Ok(record) = serde_json::from_str::<QueryRecord>(head) {
            return Ok(RecordReader {
                path: path.to_path_buf(),
                pending: Some(record),
                lines: Some(reader.lines()),
                line,
                buffered: Vec::new().into_iter(),
            });
        }
    }

    let mut document = first.clone();
    reader
        .read_to_string(&mut document)
        .map_err(|e| ProfileError::io(path, e))?;
    let records = parse_document(path, &document, line)?;
    Ok(RecordReader::buffered(path, records))
}

fn parse_document(
    path: &Path,
    document: &str,
    first_line: usize,
) -> Result<Vec<QueryRecord>, ProfileError> {
    let value: serde_json::Value =
        serde_json::from_str(document).map_err(|e| ProfileError::json(path, e))?;

    let records = match value {
        serde_json::Value::Array(items) => serde_json::Value::Array(items),
        serde_json::Value::Object(mut page)
            if page.contains_key("res") || page.contains_key("has_next_page") =>
        {
            page.remove("res").unwrap_or(serde_json::Value::Array(Vec::new()))
        }
        _ => {
            // Not a page: report the first line as a malformed record.
            let head = document.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
            let source = serde_json::from_str::<QueryRecord>(head)
                .err()
                .unwrap_or_else(|| serde::de::Error::custom("expected a query record"));
            return Err(ProfileError::Record {
                path: path.to_path_buf(),
                line: first_line,
                source,
            });
        }
    };

    serde_json::from_value(records).map_err(|e| ProfileError::json(path, e))
}

impl RecordReader {
    fn buffered(path: &Path, records: Vec<QueryRecord>) -> Self {
        Self {
            path: path.to_path_buf(),
            pending: None,
            lines: None,
            line: 0,
            buffered: records.into_iter(),
        }
    }
}

impl Iterator for RecordReader {
    type Item = Result<QueryRecord, ProfileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.pending.take() {
            return Some(Ok(record));
        }
        let Some(lines) = self.lines.as_mut() else {
            return self.buffered.next().map(Ok);
        };

        for next in lines.by_ref() {
            self.line += 1;
            let text = match next {
                Ok(text) => text,
                Err(e) => return Some(Err(ProfileError::io(&self.path, e))),
            };
            if text.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&text).map_err(|source| ProfileError::Record {
                path: self.path.clone(),
                line: self.line,
                source,
            }));
        }
        None
    }
}
