//! A chat session with the health agent.

use super::{AgentRuntime, ToolHost};
use crate::error::Result;
use crate::llm::Conversation;

/// Owns the runtime, the tools, and the conversation history.
pub struct ChatSession {
    runtime: Box<dyn AgentRuntime>,
    tools: Box<dyn ToolHost>,
    conversation: Conversation,
}

impl ChatSession {
    pub fn new(runtime: Box<dyn AgentRuntime>, tools: Box<dyn ToolHost>) -> Self {
        let conversation = runtime.reset();
        Self {
            runtime,
            tools,
            conversation,
        }
    }

    /// Sends a user message and returns the agent's answer.
    ///
    /// On error the history is left as it was before the call.
    pub async fn chat(&mut self, input: &str) -> Result<String> {
        let snapshot = self.conversation.clone();
        self.conversation.add_user(input);

        match self
            .runtime
            .converse(&mut self.conversation, self.tools.as_ref())
            .await
        {
            Ok(answer) => Ok(answer),
            Err(e) => {
                self.conversation = snapshot;
                Err(e)
            }
        }
    }

    /// Starts a fresh conversation.
    pub fn reset(&mut self) {
        self.conversation = self.runtime.reset();
        tracing::info!("Conversation reset");
    }

    /// Returns the conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}
