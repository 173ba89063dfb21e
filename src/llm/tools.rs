//! LLM tool definitions for function calling.
//!
//! The agent exposes two read-only tools: the schema description and
//! guarded SQL execution.

use serde::{Deserialize, Serialize};

/// Name of the schema description tool.
pub const GET_DATABASE_SCHEMA: &str = "get_database_schema";

/// Name of the SQL execution tool.
pub const EXECUTE_SQL_QUERY: &str = "execute_sql_query";

/// Tool definition for LLM function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Input parameters for the execute_sql_query tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteSqlInput {
    pub sql_query: String,
}

/// Returns the tool definitions available to the LLM.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_DATABASE_SCHEMA.to_string(),
            description: "Return the database schema: tables, columns, data formats, and \
                          example queries. Call this before writing any SQL."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: EXECUTE_SQL_QUERY.to_string(),
            description: "Execute a read-only SQL query (SELECT or WITH only) against the \
                          health database and return the rows as JSON. At most the first \
                          rows are returned; use LIMIT to keep results small."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "sql_query": {
                        "type": "string",
                        "description": "The SQL query to execute"
                    }
                },
                "required": ["sql_query"]
            }),
        },
    ]
}
