/// The parser capability interface and the extraction entry point.
pub mod backend;
/// SQL dialect selection.
pub mod dialect;
/// Column-token extraction from SQL expressions.
pub mod expr;
/// Identifier and table-name normalization helpers (qualified names, quoted identifiers).
pub mod names;
/// `sqlparser`-based implementation of the parser capability.
pub mod sql_parser;
