//! LLM integration for vendor onboarding.
//!
//! The provider is an OpenAI-compatible chat-completions endpoint reached over
//! reqwest. The `Reasoning` layer owns the system prompt and turns provider
//! responses into either text or tool calls.

pub mod openai;
pub mod provider;
pub mod reasoning;

#[cfg(test)]
pub(crate) mod testing;

pub use openai::OpenAiProvider;
pub use provider::*;
pub use reasoning::{Reasoning, ReasoningContext, RespondOutput, RespondResult, TokenUsage};

use std::sync::Arc;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OpenAiProvider::new(&config.base_url, config.api_key.clone(), &config.model)?;
    tracing::info!(
        "Using OpenAI-compatible endpoint {} (model: {})",
        config.base_url,
        config.model
    );
    Ok(Arc::new(provider))
}
