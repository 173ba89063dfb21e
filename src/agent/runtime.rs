//! Tool-calling agent loop.

use std::time::Instant;

use async_trait::async_trait;

use super::{AgentRuntime, ToolHost};
use crate::error::Result;
use crate::llm::{build_messages, Conversation, LlmClient, Message, SYSTEM_PROMPT};

/// Model round trips allowed per question unless configured otherwise.
const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Exchanges kept in history unless configured otherwise.
const DEFAULT_MAX_EXCHANGES: usize = 10;

/// Runs the model until it answers without requesting tools.
pub struct ToolLoopRuntime {
    client: Box<dyn LlmClient>,
    system_prompt: String,
    max_iterations: usize,
    max_exchanges: usize,
}

impl ToolLoopRuntime {
    /// Creates a runtime using the health assistant prompt.
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            client,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_exchanges: DEFAULT_MAX_EXCHANGES,
        }
    }

    /// Replaces the system prompt.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Sets the number of model calls allowed per question.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Sets how many exchanges new conversations keep.
    pub fn with_max_exchanges(mut self, max_exchanges: usize) -> Self {
        self.max_exchanges = max_exchanges;
        self
    }
}

#[async_trait]
impl AgentRuntime for ToolLoopRuntime {
    async fn converse(
        &self,
        conversation: &mut Conversation,
        tools: &dyn ToolHost,
    ) -> Result<String> {
        let start = Instant::now();
        let definitions = tools.definitions();

        for iteration in 1..=self.max_iterations {
            let messages = build_messages(&self.system_prompt, conversation);

            tracing::debug!(
                iteration,
                message_count = messages.len(),
                tool_count = definitions.len(),
                "Sending request to LLM"
            );

            let llm_start = Instant::now();
            let response = self
                .client
                .complete_with_tools(&messages, &definitions)
                .await?;

            tracing::debug!(
                llm_duration_ms = llm_start.elapsed().as_millis(),
                has_tool_calls = response.has_tool_calls(),
                response_len = response.content.len(),
                "Received LLM response"
            );

            if !response.has_tool_calls() {
                conversation.add_assistant(response.content.as_str());
                tracing::info!(
                    iterations = iteration,
                    total_duration_ms = start.elapsed().as_millis(),
                    "Agent answered"
                );
                return Ok(response.content);
            }

            let calls = response.tool_calls.clone();
            conversation.add(Message::assistant_with_tool_calls(
                response.content,
                response.tool_calls,
            ));

            for call in calls {
                let output = tools.call(&call.name, &call.arguments).await;
                conversation.add(Message::tool_result(call.id, output));
            }
        }

        let notice = format!(
            "I could not finish this question within {} steps. Try asking it more specifically.",
            self.max_iterations
        );
        tracing::warn!(
            max_iterations = self.max_iterations,
            total_duration_ms = start.elapsed().as_millis(),
            "Agent hit the iteration limit"
        );
        conversation.add_assistant(notice.as_str());
        Ok(notice)
    }

    fn reset(&self) -> Conversation {
        Conversation::with_max_exchanges(self.max_exchanges)
    }
}
