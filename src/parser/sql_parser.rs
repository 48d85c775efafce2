use std::collections::BTreeSet;
use std::ops::ControlFlow;

use sqlparser::ast::{
    Expr, GroupByExpr, JoinConstraint, JoinOperator, Query, Select, SetExpr, Statement,
    TableFactor, TableWithJoins, Visit, Visitor,
};
use sqlparser::parser::Parser;

use crate::error::ParseError;
use crate::parser::backend::{PredicateContext, ReferenceParser, StatementReferences};
use crate::parser::dialect::DialectKind;
use crate::parser::expr::{column_token, AliasScope};
use crate::parser::names::{alias_key, normalize_table_name, split_qualified_name};

/// [`ReferenceParser`] built on `sqlparser`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlParserBackend {
    dialect: DialectKind,
}

impl SqlParserBackend {
    /// Backend parsing with the given dialect.
    pub fn new(dialect: DialectKind) -> Self {
        Self { dialect }
    }

    /// Dialect in use.
    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    /// Parse SQL text into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, ParseError> {
        let dialect = self.dialect.dialect();
        Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| ParseError::Syntax(e.to_string()))
    }
}

impl ReferenceParser for SqlParserBackend {
    fn fingerprint(&self) -> String {
        format!("sqlparser:{}", self.dialect)
    }

    fn tables(&self, sql: &str) -> Result<BTreeSet<String>, ParseError> {
        Ok(self.references(sql)?.tables)
    }

    fn columns_in_context(
        &self,
        sql: &str,
        context: PredicateContext,
    ) -> Result<BTreeSet<String>, ParseError> {
        let mut references = self.references(sql)?;
        Ok(std::mem::take(references.columns_mut(context)))
    }

    fn references(&self, sql: &str) -> Result<StatementReferences, ParseError> {
        if sql.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        let statements = self.parse(sql)?;

        let mut walker = ReferenceWalker::default();
        let mut analysed = 0usize;
        for statement in &statements {
            if let Statement::Query(query) = statement {
                walker.walk_query(query, &[]);
                analysed += 1;
            }
        }

        if analysed == 0 {
            let kind = statements
                .first()
                .map(|statement| {
                    statement
                        .to_string()
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .to_ascii_uppercase()
                })
                .unwrap_or_else(|| "no statement".to_string());
            return Err(ParseError::Unsupported(kind));
        }

        Ok(walker.finish())
    }
}

/// Structural walk over query bodies, collecting tables and clause tokens.
#[derive(Default)]
struct ReferenceWalker {
    references: StatementReferences,
    /// CTE names visible at the current point, one set per enclosing query.
    cte_scopes: Vec<BTreeSet<String>>,
}

impl ReferenceWalker {
    fn walk_query(&mut self, query: &Query, scopes: &[AliasScope]) {
        let ctes = query
            .with
            .as_ref()
            .map(|with| with.cte_tables.as_slice())
            .unwrap_or_default();
        self.cte_scopes.push(
            ctes.iter()
                .map(|cte| alias_key(&cte.alias.name.value))
                .collect(),
        );
        for cte in ctes {
            self.walk_query(&cte.query, scopes);
        }
        self.walk_set_expr(&query.body, scopes);
        self.cte_scopes.pop();
    }

    fn is_cte(&self, table: &str) -> bool {
        let key = alias_key(table);
        self.cte_scopes.iter().any(|names| names.contains(&key))
    }

    fn walk_set_expr(&mut self, body: &SetExpr, scopes: &[AliasScope]) {
        match body {
            SetExpr::Select(select) => self.walk_select(select, scopes),
            SetExpr::Query(query) => self.walk_query(query, scopes),
            SetExpr::SetOperation { left, right, .. } => {
                self.walk_set_expr(left, scopes);
                self.walk_set_expr(right, scopes);
            }
            _ => {}
        }
    }

    fn walk_select(&mut self, select: &Select, parent: &[AliasScope]) {
        let mut scopes = parent.to_vec();
        scopes.push(alias_scope(&select.from));

        for table_with_joins in &select.from {
            self.walk_table_with_joins(table_with_joins, &scopes);
        }
        if let Some(selection) = &select.selection {
            self.collect(selection, PredicateContext::Filter, &scopes);
        }
        if let GroupByExpr::Expressions(keys, _) = &select.group_by {
            for key in keys {
                self.collect(key, PredicateContext::Group, &scopes);
            }
        }
    }

    fn walk_table_with_joins(&mut self, table_with_joins: &TableWithJoins, scopes: &[AliasScope]) {
        self.walk_table_factor(&table_with_joins.relation, scopes);
        for join in &table_with_joins.joins {
            self.walk_table_factor(&join.relation, scopes);
            if let JoinOperator::AsOf {
                match_condition, ..
            } = &join.join_operator
            {
                self.collect(match_condition, PredicateContext::Join, scopes);
            }
            match join_constraint(&join.join_operator) {
                Some(JoinConstraint::On(expr)) => {
                    self.collect(expr, PredicateContext::Join, scopes);
                }
                Some(JoinConstraint::Using(columns)) => {
                    for column in columns {
                        self.references
                            .join_columns
                            .insert(normalize_table_name(&column.to_string()));
                    }
                }
                _ => {}
            }
        }
    }

    fn walk_table_factor(&mut self, factor: &TableFactor, scopes: &[AliasScope]) {
        match factor {
            TableFactor::Table { name, .. } => {
                let table = normalize_table_name(&name.to_string());
                if !self.is_cte(&table) {
                    self.references.tables.insert(table);
                }
            }
            TableFactor::Derived { subquery, .. } => self.walk_query(subquery, scopes),
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.walk_table_with_joins(table_with_joins, scopes),
            _ => {}
        }
    }

    fn collect(&mut self, expr: &Expr, context: PredicateContext, scopes: &[AliasScope]) {
        let mut collector = ClauseCollector {
            walker: self,
            context,
            scopes,
            depth: 0,
        };
        let _ = expr.visit(&mut collector);
    }

    fn finish(self) -> StatementReferences {
        self.references
    }
}

/// Collects column tokens from one clause expression.
///
/// Subqueries met along the way are walked as queries of their own, so their
/// SELECT lists never leak into the enclosing clause.
struct ClauseCollector<'w, 's> {
    walker: &'w mut ReferenceWalker,
    context: PredicateContext,
    scopes: &'s [AliasScope],
    depth: usize,
}

impl Visitor for ClauseCollector<'_, '_> {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if self.depth == 0 {
            self.walker.walk_query(query, self.scopes);
        }
        self.depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.depth = self.depth.saturating_sub(1);
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if self.depth == 0 {
            if let Some(token) = column_token(expr, self.scopes) {
                self.walker
                    .references
                    .columns_mut(self.context)
                    .insert(token);
            }
        }
        ControlFlow::Continue(())
    }
}

fn join_constraint(operator: &JoinOperator) -> Option<&JoinConstraint> {
    match operator {
        JoinOperator::Join(constraint)
        | JoinOperator::Inner(constraint)
        | JoinOperator::Left(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::Right(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint)
        | JoinOperator::Semi(constraint)
        | JoinOperator::LeftSemi(constraint)
        | JoinOperator::RightSemi(constraint)
        | JoinOperator::Anti(constraint)
        | JoinOperator::LeftAnti(constraint)
        | JoinOperator::RightAnti(constraint)
        | JoinOperator::StraightJoin(constraint)
        | JoinOperator::AsOf { constraint, .. } => Some(constraint),
        _ => None,
    }
}

/// Alias bindings declared by a FROM list, including nested joins.
///
/// Every table binds its own terminal name; an explicit alias binds too and
/// wins on collision.
fn alias_scope(from: &[TableWithJoins]) -> AliasScope {
    let mut scope = AliasScope::new();
    for table_with_joins in from {
        register_aliases(table_with_joins, &mut scope);
    }
    scope
}

fn register_aliases(table_with_joins: &TableWithJoins, scope: &mut AliasScope) {
    let factors = std::iter::once(&table_with_joins.relation)
        .chain(table_with_joins.joins.iter().map(|join| &join.relation));
    for factor in factors {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let parts = split_qualified_name(&name.to_string());
                let table = parts.join(".");
                if let Some(last) = parts.last() {
                    scope.entry(alias_key(last)).or_insert_with(|| table.clone());
                }
                if let Some(alias) = alias {
                    scope.insert(alias_key(&alias.name.value), table);
                }
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => register_aliases(table_with_joins, scope),
            _ => {}
        }
    }
}
