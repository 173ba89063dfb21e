//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{AgentError, Result};
use crate::llm::{AnthropicClient, AnthropicConfig, LlmClient, LlmProvider, MockLlmClient};

/// Creates an LLM client for the given provider.
///
/// For Anthropic the API key is resolved in order:
/// 1. Provided `api_key` parameter
/// 2. `ANTHROPIC_API_KEY` environment variable
pub fn create_client(
    provider: LlmProvider,
    settings: &LlmConfig,
    api_key: Option<String>,
) -> Result<Box<dyn LlmClient>> {
    match provider {
        LlmProvider::Anthropic => {
            let key = api_key
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    AgentError::llm("No API key configured. Set ANTHROPIC_API_KEY.")
                })?;
            let config = AnthropicConfig::new(key, settings.model.clone())
                .with_timeout(settings.timeout_secs)
                .with_max_tokens(settings.max_tokens);
            Ok(Box::new(AnthropicClient::new(config)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
