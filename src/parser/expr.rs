use std::collections::HashMap;

use sqlparser::ast::{Expr, Ident};

/// Alias bindings visible in one SELECT: lowercase alias → base table name.
pub type AliasScope = HashMap<String, String>;

/// Extract a column token from an expression.
///
/// Plain identifiers (`region`) are returned as written. Qualified
/// identifiers (`b.region`) have their qualifier resolved through the alias
/// scopes, innermost first, so the token names the base table
/// (`customers.region`). Unknown qualifiers are kept verbatim.
pub fn column_token(expr: &Expr, scopes: &[AliasScope]) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => {
            let (column, qualifier) = parts.split_last()?;
            if qualifier.is_empty() {
                return Some(column.value.clone());
            }
            Some(format!(
                "{}.{}",
                resolve_qualifier(qualifier, scopes),
                column.value
            ))
        }
        _ => None,
    }
}

fn resolve_qualifier(qualifier: &[Ident], scopes: &[AliasScope]) -> String {
    let written = qualifier
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".");
    let key = written.to_ascii_lowercase();
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.get(&key))
        .cloned()
        .unwrap_or(written)
}
