/// Run configuration and its JSON loader.
pub mod config;
/// Ingestion, incremental parsing, and scoring of a profile store.
pub mod pipeline;
