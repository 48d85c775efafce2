/// Query execution records and the filter deciding which ones count.
pub mod record;
/// Readers for query-history files (JSON Lines, arrays, API pages).
pub mod source;
/// Per-query execution statistics.
pub mod statistics;
/// Accumulated history, parsed-query upserts, and their on-disk state.
pub mod store;
