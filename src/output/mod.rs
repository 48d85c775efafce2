/// Atomic file writes and publishing of the profile tables.
pub mod formatter;
/// Builds a Markdown report ranking each table's columns.
pub mod report;
