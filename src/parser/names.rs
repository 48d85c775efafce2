/// Return the identifier without surrounding quotes.
///
/// Recognises ANSI double quotes, `MySQL`/Databricks backticks and
/// T-SQL brackets.
pub fn unquote_identifier(ident: &str) -> &str {
    for (open, close) in [('"', '"'), ('`', '`'), ('[', ']')] {
        if let Some(inner) = ident
            .strip_prefix(open)
            .and_then(|s| s.strip_suffix(close))
        {
            return inner;
        }
    }
    ident
}

/// Normalize an identifier for case-insensitive alias lookups.
pub fn alias_key(ident: &str) -> String {
    unquote_identifier(ident.trim()).to_ascii_lowercase()
}

/// Split a dotted name into its unquoted parts.
///
/// Handles dots inside quoted identifiers, e.g. `"my.schema"."table.name"`.
pub fn split_qualified_name(name: &str) -> Vec<String> {
    let mut closing: Option<char> = None;
    let mut start = 0usize;
    let mut parts = Vec::new();

    for (idx, ch) in name.char_indices() {
        match (closing, ch) {
            (Some(close), c) if c == close => closing = None,
            (Some(_), _) => {}
            (None, '"') => closing = Some('"'),
            (None, '`') => closing = Some('`'),
            (None, '[') => closing = Some(']'),
            (None, '.') => {
                parts.push(unquote_identifier(name[start..idx].trim()).to_string());
                start = idx + 1;
            }
            (None, _) => {}
        }
    }
    parts.push(unquote_identifier(name[start..].trim()).to_string());
    parts
}

/// Render a possibly quoted, possibly schema-qualified table name in the
/// plain dotted form used for attribution.
///
/// Examples:
/// - `"sales"."orders"` -> `sales.orders`
/// - `` `main`.`db`.`t` `` -> `main.db.t`
/// - `orders` -> `orders`
pub fn normalize_table_name(name: &str) -> String {
    split_qualified_name(name.trim()).join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_qualified_name_handles_quoted_dots() {
        assert_eq!(
            split_qualified_name(r#""my.schema"."table.name""#),
            vec!["my.schema".to_string(), "table.name".to_string()]
        );
        assert_eq!(
            split_qualified_name("[dbo].[Orders]"),
            vec!["dbo".to_string(), "Orders".to_string()]
        );
    }

    #[test]
    fn normalize_table_name_strips_every_quote_style() {
        assert_eq!(normalize_table_name(r#""sales"."orders""#), "sales.orders");
        assert_eq!(normalize_table_name("`main`.`db`.`t`"), "main.db.t");
        assert_eq!(normalize_table_name("orders"), "orders");
    }

    #[test]
    fn alias_key_is_case_insensitive() {
        assert_eq!(alias_key(r#""Ord""#), "ord");
        assert_eq!(alias_key(" A "), "a");
    }
}
