//! OpenAI-compatible chat-completions provider.
//!
//! Talks to any `/chat/completions` endpoint that speaks the OpenAI
//! function-calling dialect.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, LlmProvider, Role, ToolCall, ToolCompletionRequest, ToolCompletionResponse,
    ToolDefinition,
};

const PROVIDER: &str = "openai";

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    base_url: String,
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, api_key: SecretString, model: &str) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            client,
        })
    }

    async fn send(&self, body: serde_json::Value) -> Result<ApiResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        match status {
            200 => {}
            429 => {
                return Err(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                });
            }
            401 | 403 => {
                return Err(LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                });
            }
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                tracing::warn!(status, body = %error_body, "Provider returned error");
                return Err(LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("HTTP {}: {}", status, error_body),
                });
            }
        }

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to parse response: {}", e),
            })
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": to_api_messages(messages),
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::json!(to_api_tools(tools));
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        model_pricing(&self.model)
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        let body = self.request_body(&request.messages, &request.tools);
        let api = self.send(body).await?;
        let (input_tokens, output_tokens) = api.token_counts();
        let choice = api.into_first_choice()?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(from_api_tool_call)
            .collect();

        Ok(ToolCompletionResponse {
            content: choice.message.content,
            tool_calls,
            input_tokens,
            output_tokens,
        })
    }
}

/// Per-token USD prices for known models; unknown models are priced at zero.
fn model_pricing(model: &str) -> (Decimal, Decimal) {
    match model {
        m if m.starts_with("gpt-4o-mini") => (dec!(0.00000015), dec!(0.0000006)),
        m if m.starts_with("gpt-4o") => (dec!(0.0000025), dec!(0.00001)),
        m if m.starts_with("gpt-4.1-mini") => (dec!(0.0000004), dec!(0.0000016)),
        m if m.starts_with("gpt-4.1") => (dec!(0.000002), dec!(0.000008)),
        _ => (Decimal::ZERO, Decimal::ZERO),
    }
}

fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
    messages
        .iter()
        .map(|m| {
            let tool_calls = m.tool_calls.as_ref().filter(|c| !c.is_empty()).map(|calls| {
                calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        id: tc.id.clone(),
                        r#type: "function".to_string(),
                        function: ApiFunction {
                            name: tc.name.clone(),
                            arguments: match &tc.arguments {
                                serde_json::Value::String(raw) => raw.clone(),
                                other => other.to_string(),
                            },
                        },
                    })
                    .collect()
            });
            // Assistant turns that only carry tool calls send a null content.
            let content = if m.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(m.content.clone())
            };
            ApiMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                }
                .to_string(),
                content,
                tool_calls,
                tool_call_id: m.tool_call_id.clone(),
            }
        })
        .collect()
}

fn to_api_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })
        })
        .collect()
}

/// Arguments arrive as a JSON-encoded string. Unparsable payloads are kept
/// verbatim so the fault surfaces when the tool is dispatched.
fn from_api_tool_call(tc: ApiToolCall) -> ToolCall {
    let arguments = if tc.function.arguments.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(&tc.function.arguments)
            .unwrap_or(serde_json::Value::String(tc.function.arguments))
    };
    ToolCall {
        id: tc.id,
        name: tc.function.name,
        arguments,
    }
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

impl ApiResponse {
    fn token_counts(&self) -> (u32, u32) {
        self.usage
            .as_ref()
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0))
    }

    fn into_first_choice(self) -> Result<ApiChoice, LlmError> {
        self.choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "No choices in response".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
