//! Reasoning layer: wraps an LLM provider with tool calling support.
//!
//! The system prompt is held here and prepended to every request. It is
//! never written into the caller's conversation history.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::{ChatMessage, LlmProvider, ToolCall, ToolCompletionRequest, ToolDefinition};

/// Context for a reasoning operation.
#[derive(Default)]
pub struct ReasoningContext {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

impl ReasoningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Token usage from an LLM call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Result of a reasoning call: either text or tool calls.
#[derive(Debug)]
pub enum RespondResult {
    /// The model responded with text.
    Text(String),
    /// The model wants to call tools.
    ToolCalls {
        tool_calls: Vec<ToolCall>,
        /// Optional text content alongside tool calls.
        content: Option<String>,
    },
}

/// Output from a respond_with_tools call.
#[derive(Debug)]
pub struct RespondOutput {
    pub result: RespondResult,
    pub usage: TokenUsage,
}

/// Reasoning layer that wraps an LLM provider.
pub struct Reasoning {
    llm: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
}

impl Reasoning {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// The exact message list sent to the provider: system turn first, then
    /// the supplied history.
    pub fn request_messages(&self, context: &ReasoningContext) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(context.messages.len() + 1);
        if let Some(ref prompt) = self.system_prompt {
            messages.push(ChatMessage::system(prompt));
        }
        messages.extend(context.messages.iter().cloned());
        messages
    }

    /// Call the LLM with tool definitions, returning either text or tool calls.
    pub async fn respond_with_tools(
        &self,
        context: &ReasoningContext,
    ) -> Result<RespondOutput, LlmError> {
        let request =
            ToolCompletionRequest::new(self.request_messages(context), context.tools.clone());
        let response = self.llm.complete_with_tools(request).await?;

        let usage = TokenUsage {
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        };

        if response.tool_calls.is_empty() {
            Ok(RespondOutput {
                result: RespondResult::Text(response.content.unwrap_or_default()),
                usage,
            })
        } else {
            Ok(RespondOutput {
                result: RespondResult::ToolCalls {
                    tool_calls: response.tool_calls,
                    content: response.content,
                },
                usage,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::Role;

    #[test]
    fn system_prompt_prepended_once() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let reasoning = Reasoning::new(llm).with_system_prompt("You are helpful.".into());
        let ctx = ReasoningContext::new().with_messages(vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi!"),
        ]);

        let messages = reasoning.request_messages(&ctx);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You are helpful.");
        assert_eq!(
            messages.iter().filter(|m| m.role == Role::System).count(),
            1
        );
        // Caller's history is untouched.
        assert_eq!(ctx.messages.len(), 2);
    }

    #[test]
    fn no_system_prompt_configured() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let reasoning = Reasoning::new(llm);
        let ctx = ReasoningContext::new().with_messages(vec![ChatMessage::user("Hello")]);
        let messages = reasoning.request_messages(&ctx);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn text_reply_carries_usage() {
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::text("plain answer")]));
        let reasoning = Reasoning::new(llm.clone()).with_system_prompt("Be brief.".into());
        let ctx = ReasoningContext::new().with_messages(vec![ChatMessage::user("Hi")]);

        let output = reasoning.respond_with_tools(&ctx).await.unwrap();
        assert!(matches!(output.result, RespondResult::Text(ref t) if t == "plain answer"));
        assert_eq!(output.usage, TokenUsage::default());
        let sent = llm.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn tool_calls_are_surfaced() {
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::tool_calls(vec![(
            "call_1",
            "getOnboardingSummary",
            serde_json::json!({"session_id": "s1"}),
        )])]));
        let reasoning = Reasoning::new(llm);
        let ctx = ReasoningContext::new()
            .with_messages(vec![ChatMessage::user("summary please")])
            .with_tools(vec![ToolDefinition {
                name: "getOnboardingSummary".into(),
                description: String::new(),
                parameters: serde_json::json!({"type": "object"}),
            }]);

        let output = reasoning.respond_with_tools(&ctx).await.unwrap();
        match output.result {
            RespondResult::ToolCalls { tool_calls, .. } => {
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].id, "call_1");
            }
            RespondResult::Text(_) => panic!("expected tool calls"),
        }
    }
}
