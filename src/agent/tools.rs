//! Health database tools exposed to the model.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::ToolHost;
use crate::catalog::SchemaCatalog;
use crate::db::Row;
use crate::llm::tools::{
    get_tool_definitions, ExecuteSqlInput, ToolDefinition, EXECUTE_SQL_QUERY,
    GET_DATABASE_SCHEMA,
};
use crate::query::{QueryExecutor, QueryResult};

/// Rows handed to the model per query unless configured otherwise.
pub const DEFAULT_MAX_ROWS_FOR_MODEL: usize = 20;

/// Output of a successful `execute_sql_query` call.
#[derive(Debug, Serialize)]
struct SqlSuccess {
    success: bool,
    row_count: usize,
    data: Vec<Row>,
    truncated: bool,
    message: String,
}

/// Output of a failed `execute_sql_query` call.
#[derive(Debug, Serialize)]
struct SqlFailure {
    success: bool,
    error: String,
    message: String,
}

/// Output for unknown tools and malformed arguments.
#[derive(Debug, Serialize)]
struct ToolError {
    error: String,
}

/// Exposes the schema catalog and query executor as tools.
pub struct HealthTools {
    catalog: Arc<SchemaCatalog>,
    executor: Arc<QueryExecutor>,
    max_rows: usize,
}

impl HealthTools {
    pub fn new(catalog: Arc<SchemaCatalog>, executor: Arc<QueryExecutor>) -> Self {
        Self {
            catalog,
            executor,
            max_rows: DEFAULT_MAX_ROWS_FOR_MODEL,
        }
    }

    /// Sets how many rows are handed to the model per query.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    async fn execute_sql(&self, arguments: &str) -> String {
        let input: ExecuteSqlInput = match serde_json::from_str(arguments) {
            Ok(input) => input,
            Err(e) => {
                return to_json(&ToolError {
                    error: format!("Invalid arguments for {}: {}", EXECUTE_SQL_QUERY, e),
                })
            }
        };

        tracing::debug!(sql = %input.sql_query, "Model requested query");
        let result = self.executor.execute(&input.sql_query).await;
        self.format_result(result)
    }

    /// Shapes an executor result for the model, capping the rows.
    fn format_result(&self, result: QueryResult) -> String {
        if result.success {
            let row_count = result.row_count;
            let truncated = row_count > self.max_rows;
            let data = result.data.into_iter().take(self.max_rows).collect();

            to_json(&SqlSuccess {
                success: true,
                row_count,
                data,
                truncated,
                message: format!("Query succeeded: {} rows returned.", row_count),
            })
        } else {
            to_json(&SqlFailure {
                success: false,
                error: result.error.unwrap_or_default(),
                message: "Query failed. Read the error and try a different query.".to_string(),
            })
        }
    }
}

#[async_trait]
impl ToolHost for HealthTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        get_tool_definitions()
    }

    async fn call(&self, name: &str, arguments: &str) -> String {
        tracing::info!(tool = name, "Tool call");

        match name {
            GET_DATABASE_SCHEMA => self.catalog.describe().to_string(),
            EXECUTE_SQL_QUERY => self.execute_sql(arguments).await,
            _ => to_json(&ToolError {
                error: format!("Unknown tool: {}", name),
            }),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\":\"failed to serialize tool output: {}\"}}", e))
}
