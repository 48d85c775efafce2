/// Table attribution of column tokens under ambiguity.
pub mod attribution;
/// Per-query extraction and attribution, sequential and parallel.
pub mod query_classifier;
/// Column references, predicate-context flags, and parsed-query records.
pub mod references;
