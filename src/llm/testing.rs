//! Scripted provider for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::provider::{LlmProvider, ToolCall, ToolCompletionRequest, ToolCompletionResponse};

type Reply = Result<ToolCompletionResponse, LlmError>;

/// Replays a fixed list of replies and records every tool request it sees.
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ToolCompletionRequest>>,
}

impl ScriptedLlm {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn text(content: &str) -> Reply {
        Ok(ToolCompletionResponse {
            content: Some(content.to_string()),
            tool_calls: vec![],
            input_tokens: 0,
            output_tokens: 0,
        })
    }

    pub(crate) fn tool_calls(calls: Vec<(&str, &str, serde_json::Value)>) -> Reply {
        Ok(ToolCompletionResponse {
            content: None,
            tool_calls: calls
                .into_iter()
                .map(|(id, name, arguments)| ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments,
                })
                .collect(),
            input_tokens: 0,
            output_tokens: 0,
        })
    }

    pub(crate) fn failure(reason: &str) -> Reply {
        Err(LlmError::RequestFailed {
            provider: "scripted".to_string(),
            reason: reason.to_string(),
        })
    }

    pub(crate) fn requests(&self) -> Vec<ToolCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Reply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::InvalidResponse {
                    provider: "scripted".to_string(),
                    reason: "script exhausted".to_string(),
                })
            })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.next_reply()
    }
}
