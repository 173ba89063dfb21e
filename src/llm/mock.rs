//! Mock LLM client for testing.
//!
//! Without a script, the mock follows the agent workflow deterministically:
//! it asks for the schema, then runs one query derived from the question,
//! then summarizes the tool result. A script replaces those turns with
//! canned responses, which tests use to drive specific paths.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{AgentError, Result};
use crate::llm::tools::{ToolDefinition, EXECUTE_SQL_QUERY, GET_DATABASE_SCHEMA};
use crate::llm::types::{LlmResponse, Message, Role, ToolCall};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned or workflow-driven responses.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Responses returned in order before falling back to the workflow.
    script: Arc<Mutex<VecDeque<LlmResponse>>>,
    /// Custom SQL mappings (pattern -> query).
    custom_sql: Vec<(String, String)>,
    /// Message lists received, in call order.
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues responses to return before the default workflow.
    pub fn with_script(self, responses: Vec<LlmResponse>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(responses);
        }
        self
    }

    /// Adds a custom SQL mapping.
    ///
    /// When the question contains `pattern`, the workflow runs `sql`.
    pub fn with_sql(mut self, pattern: impl Into<String>, sql: impl Into<String>) -> Self {
        self.custom_sql.push((pattern.into().to_lowercase(), sql.into()));
        self
    }

    /// Returns the message lists received so far.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Picks the SQL the workflow runs for a question.
    fn mock_sql(&self, question: &str) -> String {
        let question_lower = question.to_lowercase();

        for (pattern, sql) in &self.custom_sql {
            if question_lower.contains(pattern.as_str()) {
                return sql.clone();
            }
        }

        if question_lower.contains("glucose") {
            return "SELECT user_uuid, msrmt_ymd, \
                    CAST(SUBSTRING(bs_rslt_cn FROM 'Glucose Level: ([0-9]+)') AS INTEGER) AS glucose_value \
                    FROM agent.tb_glucose_msrmt ORDER BY msrmt_ymd DESC LIMIT 10"
                .to_string();
        }

        if question_lower.contains("count") || question_lower.contains("how many") {
            return "SELECT COUNT(*) AS user_count FROM agent.tb_user_info".to_string();
        }

        "SELECT user_uuid, flnm FROM agent.tb_user_info LIMIT 10".to_string()
    }

    /// Produces the next workflow turn from the messages of the current question.
    fn workflow_response(&self, messages: &[Message], tools: &[ToolDefinition]) -> LlmResponse {
        let question_start = messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .unwrap_or(0);
        let question = messages
            .get(question_start)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let tool_results: Vec<&Message> = messages[question_start..]
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();

        let has_tool = |name: &str| tools.iter().any(|t| t.name == name);

        match tool_results.len() {
            0 if has_tool(GET_DATABASE_SCHEMA) => LlmResponse::with_tool_calls(
                "",
                vec![ToolCall::new("mock_call_1", GET_DATABASE_SCHEMA, "{}")],
            ),
            1 if has_tool(EXECUTE_SQL_QUERY) => {
                let arguments = serde_json::json!({ "sql_query": self.mock_sql(question) });
                LlmResponse::with_tool_calls(
                    "",
                    vec![ToolCall::new(
                        "mock_call_2",
                        EXECUTE_SQL_QUERY,
                        arguments.to_string(),
                    )],
                )
            }
            _ => LlmResponse::text(summarize(tool_results.last().copied())),
        }
    }
}

/// Describes the last tool result in one sentence.
fn summarize(result: Option<&Message>) -> String {
    let Some(result) = result else {
        return "I can only answer questions about the health database.".to_string();
    };

    let value: serde_json::Value =
        serde_json::from_str(&result.content).unwrap_or(serde_json::Value::Null);

    match value.get("success").and_then(|v| v.as_bool()) {
        Some(true) => {
            let row_count = value.get("row_count").and_then(|v| v.as_u64()).unwrap_or(0);
            format!("The query returned {} rows.", row_count)
        }
        Some(false) => {
            let error = value
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            format!("The query failed: {}", error)
        }
        None => "I could not read the query result.".to_string(),
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        self.requests
            .lock()
            .map_err(|_| AgentError::llm("mock request log poisoned"))?
            .push(messages.to_vec());

        let scripted = self
            .script
            .lock()
            .map_err(|_| AgentError::llm("mock script poisoned"))?
            .pop_front();

        Ok(scripted.unwrap_or_else(|| self.workflow_response(messages, tools)))
    }
}
