/// Corpus rollups: per-query usage rows and per-column summaries.
pub mod aggregator;
/// Table-local min-max scaling of the summaries.
pub mod normalizer;
