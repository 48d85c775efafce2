//! Score table columns by how a historical SQL query corpus joins, filters, and groups on them.
#![warn(missing_docs)]

/// Column attribution and per-query classification of predicate usage.
pub mod classifier;
/// Error types for statement parsing and profiling runs.
pub mod error;
/// Query execution records, their statistics, and the on-disk profile store.
pub mod history;
/// File output and markdown report generation.
pub mod output;
/// SQL parsing: dialects, the parser capability, and clause extraction.
pub mod parser;
/// Run configuration and the ingest / parse / score pipeline.
pub mod profiler;
/// Corpus aggregation and table-local scaling.
pub mod scoring;
