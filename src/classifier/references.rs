use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::backend::PredicateContext;

/// A column attributed to one of the tables its statement reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnReference {
    /// Table the column is attributed to, as named in FROM / JOIN.
    pub table: String,
    /// Column name without qualifier.
    pub column: String,
}

impl ColumnReference {
    /// Build a reference from its parts.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.column)
    }
}

/// Which predicate contexts a reference was seen in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageFlags {
    /// Seen in a join condition.
    pub is_join: bool,
    /// Seen in a WHERE predicate.
    pub is_filter: bool,
    /// Seen in a GROUP BY key.
    pub is_group: bool,
}

impl UsageFlags {
    /// Record a sighting in `context`.
    pub fn mark(&mut self, context: PredicateContext) {
        match context {
            PredicateContext::Join => self.is_join = true,
            PredicateContext::Filter => self.is_filter = true,
            PredicateContext::Group => self.is_group = true,
        }
    }

    /// Whether the reference was seen in `context`.
    pub fn contains(&self, context: PredicateContext) -> bool {
        match context {
            PredicateContext::Join => self.is_join,
            PredicateContext::Filter => self.is_filter,
            PredicateContext::Group => self.is_group,
        }
    }

    /// Flags set by `contexts`.
    pub fn from_contexts(contexts: &[PredicateContext]) -> Self {
        let mut flags = Self::default();
        for context in contexts {
            flags.mark(*context);
        }
        flags
    }
}

/// A column reference together with the contexts it was seen in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedReference {
    /// Table and column.
    #[serde(flatten)]
    pub reference: ColumnReference,
    /// Predicate contexts.
    #[serde(flatten)]
    pub usage: UsageFlags,
}

/// One distinct query after extraction and attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Identifier shared by every execution of the query.
    pub query_id: String,
    /// SQL text the references were derived from.
    pub query_text: String,
    /// Fingerprint of the backend that produced this parse.
    #[serde(default)]
    pub parsed_with: String,
    /// Attributed references, sorted by (table, column), one entry each.
    pub references: Vec<AttributedReference>,
    /// Parse-failure annotation; `references` is empty when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParsedQuery {
    /// Look up the reference for a (table, column) pair.
    pub fn reference(&self, table: &str, column: &str) -> Option<&AttributedReference> {
        self.references
            .iter()
            .find(|r| r.reference.table == table && r.reference.column == column)
    }

    /// True when the text could not be analysed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
