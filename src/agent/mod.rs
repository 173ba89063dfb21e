//! Agent adapter for the health database.
//!
//! The agent runtime drives a model through tool calls; the tool host
//! exposes the schema catalog and the guarded query executor as tools.
//!
//! # Architecture
//!
//! `ChatSession::chat` → `AgentRuntime::converse` → `LlmClient` ⇄ `ToolHost::call`
//!
//! Both seams are traits so tests can swap the model or the tools.

mod runtime;
mod session;
mod tools;

pub use runtime::ToolLoopRuntime;
pub use session::ChatSession;
pub use tools::{HealthTools, DEFAULT_MAX_ROWS_FOR_MODEL};

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::{Conversation, ToolDefinition};

/// Something that can answer tool calls from the model.
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// Tools to advertise to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Runs a tool and returns its output as text for the model.
    ///
    /// Failures are reported inside the returned text, never as errors.
    async fn call(&self, name: &str, arguments: &str) -> String;
}

/// A conversational agent loop.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Answers the latest user message in `conversation`.
    ///
    /// Assistant turns and tool results are appended to `conversation`.
    async fn converse(
        &self,
        conversation: &mut Conversation,
        tools: &dyn ToolHost,
    ) -> Result<String>;

    /// Returns an empty conversation configured for this runtime.
    fn reset(&self) -> Conversation;
}
