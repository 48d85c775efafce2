use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Syntactic clause a column token was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateContext {
    /// `JOIN ... ON` / `JOIN ... USING` condition.
    Join,
    /// `WHERE` predicate.
    Filter,
    /// `GROUP BY` key.
    Group,
}

impl PredicateContext {
    /// Every context, in reporting order.
    pub const ALL: [PredicateContext; 3] = [
        PredicateContext::Join,
        PredicateContext::Filter,
        PredicateContext::Group,
    ];
}

impl fmt::Display for PredicateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateContext::Join => write!(f, "join"),
            PredicateContext::Filter => write!(f, "filter"),
            PredicateContext::Group => write!(f, "group"),
        }
    }
}

/// Tables and context-classified column tokens found in one statement.
///
/// Column tokens are either bare (`region`) or qualified with the base table
/// identifier they were written against (`customers.region`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementReferences {
    /// Tables named in FROM / JOIN clauses.
    pub tables: BTreeSet<String>,
    /// Tokens found in join conditions.
    pub join_columns: BTreeSet<String>,
    /// Tokens found in WHERE predicates.
    pub filter_columns: BTreeSet<String>,
    /// Tokens found in GROUP BY keys.
    pub group_columns: BTreeSet<String>,
}

impl StatementReferences {
    /// Tokens found in the given clause.
    pub fn columns(&self, context: PredicateContext) -> &BTreeSet<String> {
        match context {
            PredicateContext::Join => &self.join_columns,
            PredicateContext::Filter => &self.filter_columns,
            PredicateContext::Group => &self.group_columns,
        }
    }

    pub(crate) fn columns_mut(&mut self, context: PredicateContext) -> &mut BTreeSet<String> {
        match context {
            PredicateContext::Join => &mut self.join_columns,
            PredicateContext::Filter => &mut self.filter_columns,
            PredicateContext::Group => &mut self.group_columns,
        }
    }

    /// True when no table and no column token was found.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && PredicateContext::ALL
                .iter()
                .all(|context| self.columns(*context).is_empty())
    }
}

/// A SQL parsing capability the extractor can be built on.
///
/// Implementations are swapped without touching attribution or aggregation.
/// They must be shareable across worker threads.
pub trait ReferenceParser: Send + Sync {
    /// Identifies this backend and its settings. Stored parses made under a
    /// different fingerprint are stale.
    fn fingerprint(&self) -> String {
        String::new()
    }

    /// Tables named in the statement's FROM / JOIN clauses.
    fn tables(&self, sql: &str) -> Result<BTreeSet<String>, ParseError>;

    /// Column tokens appearing in the given clause.
    fn columns_in_context(
        &self,
        sql: &str,
        context: PredicateContext,
    ) -> Result<BTreeSet<String>, ParseError>;

    /// Everything at once. Backends that can do it in a single parse should
    /// override this.
    fn references(&self, sql: &str) -> Result<StatementReferences, ParseError> {
        let mut references = StatementReferences {
            tables: self.tables(sql)?,
            ..StatementReferences::default()
        };
        for context in PredicateContext::ALL {
            *references.columns_mut(context) = self.columns_in_context(sql, context)?;
        }
        Ok(references)
    }
}

/// Result of extracting one statement, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// What was found; empty when `error` is set.
    pub references: StatementReferences,
    /// Why the statement could not be analysed, if it could not.
    pub error: Option<ParseError>,
}

/// Extract references from one statement, folding a parse failure into an
/// empty, annotated result.
pub fn extract<P>(parser: &P, sql: &str) -> Extraction
where
    P: ReferenceParser + ?Sized,
{
    match parser.references(sql) {
        Ok(references) => Extraction {
            references,
            error: None,
        },
        Err(error) => Extraction {
            references: StatementReferences::default(),
            error: Some(error),
        },
    }
}
