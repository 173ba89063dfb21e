//! Parser-backed read-only check.
//!
//! Uses sqlparser-rs with the PostgreSQL dialect to confirm that a statement
//! which already passed the textual policy is a single pure read: no
//! data-modifying CTEs, no `SELECT ... INTO`, no row locks.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::{RejectReason, Verdict};

/// Parses SQL and verifies it only reads.
#[derive(Debug)]
pub struct StatementInspector {
    dialect: PostgreSqlDialect,
}

impl StatementInspector {
    /// Creates a new inspector.
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Inspects a SQL string.
    ///
    /// Anything that fails to parse is rejected.
    pub fn inspect(&self, sql: &str) -> Verdict {
        let statements = match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => statements,
            Err(e) => return Verdict::Reject(RejectReason::Unparsable(e.to_string())),
        };

        match statements.as_slice() {
            [] => Verdict::Reject(RejectReason::Unparsable("empty statement".to_string())),
            [Statement::Query(query)] => match inspect_query(query) {
                Ok(()) => Verdict::Allow,
                Err(what) => Verdict::Reject(RejectReason::NotPureRead(what)),
            },
            [_] => Verdict::Reject(RejectReason::NotPureRead(
                "statement is not a query".to_string(),
            )),
            many => Verdict::Reject(RejectReason::NotPureRead(format!(
                "{} statements in one request",
                many.len()
            ))),
        }
    }
}

impl Default for StatementInspector {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks a query, returning a description of the first non-read construct.
fn inspect_query(query: &Query) -> Result<(), String> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            inspect_query(&cte.query)?;
        }
    }

    if !query.locks.is_empty() {
        return Err("row-locking clause (FOR UPDATE/SHARE)".to_string());
    }

    inspect_set_expr(&query.body)
}

fn inspect_set_expr(set_expr: &SetExpr) -> Result<(), String> {
    match set_expr {
        SetExpr::Select(select) => inspect_select(select),
        SetExpr::Query(query) => inspect_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            inspect_set_expr(left)?;
            inspect_set_expr(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
        // INSERT/UPDATE and friends nested inside a query body
        other => Err(format!("data-modifying clause: {}", other)),
    }
}

fn inspect_select(select: &Select) -> Result<(), String> {
    if select.into.is_some() {
        return Err("SELECT ... INTO creates a table".to_string());
    }

    for table_with_joins in &select.from {
        inspect_table_with_joins(table_with_joins)?;
    }

    Ok(())
}

fn inspect_table_with_joins(twj: &TableWithJoins) -> Result<(), String> {
    inspect_table_factor(&twj.relation)?;

    for join in &twj.joins {
        inspect_table_factor(&join.relation)?;
    }

    Ok(())
}

fn inspect_table_factor(factor: &TableFactor) -> Result<(), String> {
    match factor {
        TableFactor::Derived { subquery, .. } => inspect_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => inspect_table_with_joins(table_with_joins),
        _ => Ok(()),
    }
}
