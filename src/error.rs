use std::path::PathBuf;

use thiserror::Error;

/// Boxed error produced by a query-history source.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a single SQL statement could not be analysed.
///
/// Always recovered locally: the statement contributes zero references and
/// the error is kept as an annotation on the parsed query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The query text was empty or whitespace only.
    #[error("empty query text")]
    Empty,
    /// The parser rejected the text.
    #[error("failed to parse SQL: {0}")]
    Syntax(String),
    /// The text parsed, but is not a statement shape we analyse.
    #[error("unsupported statement: {0}")]
    Unsupported(String),
}

/// Run-level failure of a profiling run.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The query-history source failed; nothing is profiled or published.
    #[error("failed to fetch query history: {0}")]
    Fetch(#[source] SourceError),
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A JSON document could not be read or written.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        /// File being decoded or encoded.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A record line in a query-history file is malformed.
    #[error("invalid query record at {}:{line}: {source}", path.display())]
    Record {
        /// Source file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// The configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProfileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProfileError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ProfileError::Json {
            path: path.into(),
            source,
        }
    }
}
