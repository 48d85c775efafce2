use std::collections::{BTreeMap, BTreeSet};

use crate::classifier::references::{AttributedReference, ColumnReference, UsageFlags};
use crate::parser::backend::{PredicateContext, StatementReferences};

/// Split a column token on its last `.` into `(table_part, column_part)`.
///
/// `table_part` is empty for unqualified tokens, and for tokens with an empty
/// qualifier such as `.x`.
pub fn split_column_token(token: &str) -> (&str, &str) {
    token.rsplit_once('.').unwrap_or(("", token))
}

/// Tables a column token is attributed to.
///
/// A qualified token goes to every table whose name contains the qualifier;
/// an unqualified token is ambiguous and goes to every table. Parser
/// artifacts (empty or single punctuation column parts) go nowhere.
pub fn attribute(tables: &BTreeSet<String>, column_token: &str) -> BTreeSet<String> {
    let (table_part, column_part) = split_column_token(column_token);
    if is_parser_artifact(column_part) {
        return BTreeSet::new();
    }

    tables
        .iter()
        .filter(|table| table_part.is_empty() || table.contains(table_part))
        .cloned()
        .collect()
}

/// Empty column parts and lone punctuation (`*`, `.`) are artifacts.
/// Single-letter names such as `x` are real columns and are kept.
fn is_parser_artifact(column_part: &str) -> bool {
    let mut chars = column_part.chars();
    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(only), None) => !(only.is_alphanumeric() || only == '_'),
        _ => false,
    }
}

/// Attribute every clause token of a statement, merging the contexts of
/// tokens that land on the same (table, column).
///
/// The result is sorted by (table, column); every table in it is one of
/// `references.tables`.
pub fn attribute_statement(references: &StatementReferences) -> Vec<AttributedReference> {
    let mut merged: BTreeMap<ColumnReference, UsageFlags> = BTreeMap::new();

    for context in PredicateContext::ALL {
        for token in references.columns(context) {
            let (_, column_part) = split_column_token(token);
            for table in attribute(&references.tables, token) {
                merged
                    .entry(ColumnReference::new(table, column_part))
                    .or_default()
                    .mark(context);
            }
        }
    }

    merged
        .into_iter()
        .map(|(reference, usage)| AttributedReference { reference, usage })
        .collect()
}
