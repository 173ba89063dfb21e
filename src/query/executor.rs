//! Guarded query execution.
//!
//! Every statement passes the read-only guard before a connection is opened.
//! Each allowed statement gets its own connection, which is closed again
//! before the result is returned. Failures never escape as errors: they are
//! folded into the returned `QueryResult`.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::db::{ConnectionFactory, Row};
use crate::error::Result;
use crate::safety::{ReadOnlyGuard, Verdict};

/// Structured outcome of a single `execute` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Whether the statement ran.
    pub success: bool,
    /// Rows in result order; empty on failure.
    pub data: Vec<Row>,
    /// Number of rows in `data`.
    pub row_count: usize,
    /// Rejection reason or database message on failure.
    pub error: Option<String>,
}

impl QueryResult {
    /// Creates a successful result.
    pub fn success(data: Vec<Row>) -> Self {
        Self {
            row_count: data.len(),
            data,
            success: true,
            error: None,
        }
    }

    /// Creates a failed result.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            row_count: 0,
            error: Some(error.into()),
        }
    }
}

/// Runs guarded, read-only SQL against connections from a factory.
pub struct QueryExecutor {
    guard: ReadOnlyGuard,
    factory: Arc<dyn ConnectionFactory>,
}

impl QueryExecutor {
    /// Creates a new query executor.
    pub fn new(guard: ReadOnlyGuard, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self { guard, factory }
    }

    /// Classifies and, if allowed, executes a statement.
    ///
    /// The SQL is sent exactly as given; normalization only affects the guard.
    pub async fn execute(&self, sql: &str) -> QueryResult {
        let start = Instant::now();

        if let Verdict::Reject(reason) = self.guard.classify(sql) {
            tracing::info!(%reason, sql_len = sql.len(), "Query rejected by guard");
            return QueryResult::failure(reason.to_string());
        }

        match self.run(sql).await {
            Ok(rows) => {
                tracing::info!(
                    row_count = rows.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Query succeeded"
                );
                QueryResult::success(rows)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Query failed"
                );
                QueryResult::failure(e.to_string())
            }
        }
    }

    /// Opens a connection, fetches all rows, and closes the connection.
    async fn run(&self, sql: &str) -> Result<Vec<Row>> {
        let mut conn = self.factory.connect().await?;
        let fetched = conn.fetch_rows(sql).await;

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Failed to close connection cleanly");
        }

        fetched
    }
}
