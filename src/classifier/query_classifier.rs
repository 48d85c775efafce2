use rayon::prelude::*;
use tracing::debug;

use crate::classifier::attribution::attribute_statement;
use crate::classifier::references::ParsedQuery;
use crate::parser::backend::{extract, ReferenceParser};

/// Extract and attribute the references of one query.
///
/// A parse failure yields a query with no references and the error recorded
/// as an annotation; it never propagates.
pub fn classify_query<P>(parser: &P, query_id: &str, query_text: &str) -> ParsedQuery
where
    P: ReferenceParser + ?Sized,
{
    let extraction = extract(parser, query_text);
    if let Some(error) = &extraction.error {
        debug!(query_id, %error, "query could not be parsed");
    }

    ParsedQuery {
        query_id: query_id.to_string(),
        query_text: query_text.to_string(),
        parsed_with: parser.fingerprint(),
        references: attribute_statement(&extraction.references),
        error: extraction.error.map(|e| e.to_string()),
    }
}

/// Classify `(query_id, query_text)` pairs on the rayon pool.
///
/// Output order matches input order.
pub fn classify_queries<P>(parser: &P, queries: &[(String, String)]) -> Vec<ParsedQuery>
where
    P: ReferenceParser + ?Sized,
{
    queries
        .par_iter()
        .map(|(query_id, query_text)| classify_query(parser, query_id, query_text))
        .collect()
}
