//! Vendor agent loop: one model call, the tools it asks for, and exactly one
//! follow-up call.
//!
//! Tool calls requested by the follow-up are never executed. The turn ends
//! with whatever text the follow-up produced.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::{
    ChatMessage, LlmProvider, Reasoning, ReasoningContext, RespondOutput, RespondResult,
};
use crate::onboarding::vendor_system_prompt;
use crate::telemetry::{Span, SpanKind, Telemetry, approx_tokens};
use crate::tools::ToolExecutor;

/// Reply when the model returns no text.
pub const NO_RESPONSE: &str = "No response generated";

/// States a turn moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    ModelResponded,
    ExecutingTools,
    AwaitingFollowup,
    Done,
}

/// Result of one completed turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Text for the user.
    pub response: String,
    /// Caller history plus the assistant and tool-result turns of this turn.
    /// Ends with an assistant turn holding `response`. Never contains the
    /// system turn.
    pub history: Vec<ChatMessage>,
    pub transitions: Vec<TurnState>,
    pub tools_executed: usize,
}

/// Core dependencies for the agent.
pub struct AgentDeps {
    pub llm: Arc<dyn LlmProvider>,
    pub tools: Arc<ToolExecutor>,
    pub telemetry: Telemetry,
}

/// Drives the onboarding conversation for one session.
pub struct VendorAgent {
    session_id: String,
    reasoning: Reasoning,
    deps: AgentDeps,
}

impl VendorAgent {
    /// `system_prompt` overrides the default onboarding instructions.
    pub fn new(
        session_id: impl Into<String>,
        deps: AgentDeps,
        system_prompt: Option<String>,
    ) -> Self {
        let session_id = session_id.into();
        let prompt = system_prompt.unwrap_or_else(|| vendor_system_prompt(&session_id));
        let reasoning = Reasoning::new(deps.llm.clone()).with_system_prompt(prompt);
        Self {
            session_id,
            reasoning,
            deps,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn tools(&self) -> &Arc<ToolExecutor> {
        &self.deps.tools
    }

    /// Run one turn and return the reply text. Never fails: a model fault
    /// becomes `Error processing your request: ...`.
    pub async fn process_query(&self, history: &[ChatMessage]) -> String {
        match self.run_turn(history).await {
            Ok(outcome) => outcome.response,
            Err(e) => {
                tracing::error!(session_id = %self.session_id, "Error processing query: {}", e);
                format!("Error processing your request: {}", e)
            }
        }
    }

    /// Run one turn over `history`. A model fault aborts the turn; tool
    /// side effects that already happened are kept.
    pub async fn run_turn(&self, history: &[ChatMessage]) -> Result<TurnOutcome, LlmError> {
        let mut transitions = vec![TurnState::AwaitingModel];
        let mut context = ReasoningContext::new()
            .with_messages(history.to_vec())
            .with_tools(self.deps.tools.registry().tool_definitions());

        let first = self.call_model(&context, "initial").await?;
        transitions.push(TurnState::ModelResponded);

        let (tool_calls, content) = match first.result {
            RespondResult::Text(text) => {
                transitions.push(TurnState::Done);
                let response = non_empty_or_default(text);
                context.messages.push(ChatMessage::assistant(response.clone()));
                return Ok(TurnOutcome {
                    response,
                    history: context.messages,
                    transitions,
                    tools_executed: 0,
                });
            }
            RespondResult::ToolCalls {
                tool_calls,
                content,
            } => (tool_calls, content),
        };

        tracing::debug!(
            session_id = %self.session_id,
            "Model requested {} tool calls",
            tool_calls.len()
        );

        context
            .messages
            .push(ChatMessage::assistant_with_tool_calls(content, tool_calls.clone()));
        transitions.push(TurnState::ExecutingTools);

        // Model order, one at a time.
        for tc in &tool_calls {
            let result = self
                .deps
                .tools
                .execute(&tc.name, &tc.arguments, &self.session_id, &self.deps.telemetry)
                .await;
            context
                .messages
                .push(ChatMessage::tool_result(&tc.id, &tc.name, result));
        }
        transitions.push(TurnState::AwaitingFollowup);

        let followup = self.call_model(&context, "followup").await?;
        let text = match followup.result {
            RespondResult::Text(text) => text,
            RespondResult::ToolCalls {
                tool_calls: discarded,
                content,
            } => {
                let names: Vec<&str> = discarded.iter().map(|tc| tc.name.as_str()).collect();
                tracing::warn!(
                    session_id = %self.session_id,
                    discarded = ?names,
                    "Follow-up requested more tools; not executing them"
                );
                content.unwrap_or_default()
            }
        };
        transitions.push(TurnState::Done);
        let response = non_empty_or_default(text);
        context.messages.push(ChatMessage::assistant(response.clone()));

        Ok(TurnOutcome {
            response,
            history: context.messages,
            transitions,
            tools_executed: tool_calls.len(),
        })
    }

    /// One model request with its LLM span.
    async fn call_model(
        &self,
        context: &ReasoningContext,
        phase: &str,
    ) -> Result<RespondOutput, LlmError> {
        let llm = self.reasoning.llm();
        let request_messages = self.reasoning.request_messages(context);
        let span = Span::new(SpanKind::LlmCall, llm.model_name())
            .with_input(serde_json::to_value(&request_messages).unwrap_or_default())
            .with_metadata("phase", phase)
            .with_metadata("session_id", self.session_id.as_str())
            .with_tag("llm");

        let start = Instant::now();
        match self.reasoning.respond_with_tools(context).await {
            Ok(output) => {
                let output_text = match &output.result {
                    RespondResult::Text(text) => text.clone(),
                    RespondResult::ToolCalls { tool_calls, .. } => {
                        serde_json::to_string(tool_calls).unwrap_or_default()
                    }
                };

                let (input_tokens, output_tokens) = if output.usage.total() > 0 {
                    (output.usage.input_tokens, output.usage.output_tokens)
                } else {
                    // Provider gave no usage; fall back to word counts.
                    let words: u32 = request_messages
                        .iter()
                        .map(|m| approx_tokens(&m.content))
                        .sum();
                    (words, approx_tokens(&output_text))
                };
                let (input_rate, output_rate) = llm.cost_per_token();
                let cost = input_rate * Decimal::from(input_tokens)
                    + output_rate * Decimal::from(output_tokens);

                self.deps.telemetry.record(
                    span.record_tokens(input_tokens, output_tokens, cost)
                        .succeed(output_text, start.elapsed()),
                );
                Ok(output)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, phase, "Model call failed: {}", e);
                self.deps
                    .telemetry
                    .record(span.fail(e.to_string(), start.elapsed()));
                Err(e)
            }
        }
    }
}

fn non_empty_or_default(text: String) -> String {
    if text.trim().is_empty() {
        NO_RESPONSE.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::{Role, ToolCompletionResponse};
    use crate::onboarding::{InMemorySessionStore, SessionStore};
    use crate::retrieval::testing::{StaticIndex, retriever};
    use crate::telemetry::MemorySink;
    use crate::tools::ToolRegistry;
    use serde_json::json;

    struct Harness {
        agent: VendorAgent,
        llm: Arc<ScriptedLlm>,
        store: Arc<InMemorySessionStore>,
        sink: Arc<MemorySink>,
    }

    fn harness(replies: Vec<Result<ToolCompletionResponse, LlmError>>) -> Harness {
        let llm = Arc::new(ScriptedLlm::new(replies));
        let store = Arc::new(InMemorySessionStore::new());
        let sink = Arc::new(MemorySink::new());
        let registry = ToolRegistry::vendor(
            store.clone(),
            Arc::new(retriever(StaticIndex::new(&["Acme Inc, Delaware, low risk"]))),
        );
        let agent = VendorAgent::new(
            "s1",
            AgentDeps {
                llm: llm.clone(),
                tools: Arc::new(ToolExecutor::new(Arc::new(registry))),
                telemetry: Telemetry::new(sink.clone()),
            },
            None,
        );
        Harness {
            agent,
            llm,
            store,
            sink,
        }
    }

    #[tokio::test]
    async fn text_reply_ends_turn_after_one_call() {
        let h = harness(vec![ScriptedLlm::text("What is your company's legal name?")]);
        let outcome = h.agent.run_turn(&[ChatMessage::user("Hi")]).await.unwrap();

        assert_eq!(outcome.response, "What is your company's legal name?");
        assert_eq!(
            outcome.transitions,
            vec![TurnState::AwaitingModel, TurnState::ModelResponded, TurnState::Done]
        );
        assert_eq!(h.llm.requests().len(), 1);
        assert_eq!(outcome.tools_executed, 0);
    }

    #[tokio::test]
    async fn empty_reply_is_no_response_generated() {
        let h = harness(vec![ScriptedLlm::text("")]);
        let reply = h.agent.process_query(&[ChatMessage::user("Hi")]).await;
        assert_eq!(reply, "No response generated");
    }

    #[tokio::test]
    async fn history_ends_with_the_returned_reply() {
        let h = harness(vec![ScriptedLlm::text("   ")]);
        let outcome = h.agent.run_turn(&[ChatMessage::user("Hi")]).await.unwrap();
        let last = outcome.history.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, NO_RESPONSE);
        assert_eq!(last.content, outcome.response);

        // Same after a tool round whose follow-up only asks for more tools.
        let h = harness(vec![
            ScriptedLlm::tool_calls(vec![("call_1", "getOnboardingSummary", json!({}))]),
            ScriptedLlm::tool_calls(vec![("call_2", "getOnboardingSummary", json!({}))]),
        ]);
        let outcome = h.agent.run_turn(&[ChatMessage::user("Status?")]).await.unwrap();
        assert_eq!(outcome.response, NO_RESPONSE);
        assert_eq!(outcome.history.last().unwrap().content, NO_RESPONSE);
        assert!(outcome.history.last().unwrap().tool_calls.is_none());
    }

    #[tokio::test]
    async fn tool_results_follow_invocation_order() {
        let h = harness(vec![
            ScriptedLlm::tool_calls(vec![
                (
                    "call_1",
                    "saveComplianceCertifications",
                    json!({
                        "session_id": "s1",
                        "company_name": "Acme Inc",
                        "certifications": "SOC 2",
                    }),
                ),
                ("call_2", "getOnboardingSummary", json!({})),
            ]),
            ScriptedLlm::text("Thanks, saved."),
        ]);

        let outcome = h
            .agent
            .run_turn(&[ChatMessage::user("We hold SOC 2")])
            .await
            .unwrap();
        assert_eq!(outcome.response, "Thanks, saved.");
        assert_eq!(outcome.tools_executed, 2);
        assert_eq!(
            outcome.transitions,
            vec![
                TurnState::AwaitingModel,
                TurnState::ModelResponded,
                TurnState::ExecutingTools,
                TurnState::AwaitingFollowup,
                TurnState::Done
            ]
        );

        let requests = h.llm.requests();
        assert_eq!(requests.len(), 2);
        let followup = &requests[1].messages;
        // system, user, assistant(tool calls), tool, tool
        assert_eq!(followup.len(), 5);
        assert_eq!(followup[0].role, Role::System);
        assert_eq!(followup[2].pending_tool_calls().len(), 2);
        assert_eq!(followup[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(followup[4].tool_call_id.as_deref(), Some("call_2"));
        // The summary ran after the save and sees it.
        assert!(followup[4].content.contains("**Compliance Certifications:** SOC 2"));

        assert!(outcome.history.iter().all(|m| m.role != Role::System));
    }

    #[tokio::test]
    async fn followup_tool_calls_are_never_executed() {
        let h = harness(vec![
            ScriptedLlm::tool_calls(vec![(
                "call_1",
                "lookupCompanyInformation",
                json!({"company_name": "Acme Inc", "country": "US"}),
            )]),
            ScriptedLlm::tool_calls(vec![(
                "call_2",
                "saveComplianceCertifications",
                json!({"company_name": "Acme Inc", "certifications": "SOC 2"}),
            )]),
        ]);

        let reply = h.agent.process_query(&[ChatMessage::user("Acme Inc, US")]).await;
        assert_eq!(reply, NO_RESPONSE);
        assert_eq!(h.llm.requests().len(), 2);

        let session = h.store.get("s1").await.unwrap().unwrap();
        assert!(session.company_lookup_complete);
        assert!(session.compliance_certifications.is_none());
        assert_eq!(h.sink.spans_of(SpanKind::ToolExecution).len(), 1);
    }

    #[tokio::test]
    async fn model_fault_becomes_error_text() {
        let h = harness(vec![ScriptedLlm::failure("upstream 500")]);
        let reply = h.agent.process_query(&[ChatMessage::user("Hi")]).await;
        assert!(reply.starts_with("Error processing your request:"), "{reply}");
        assert!(reply.contains("upstream 500"));

        let spans = h.sink.spans_of(SpanKind::LlmCall);
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_error());
    }

    #[tokio::test]
    async fn followup_fault_keeps_tool_side_effects() {
        let h = harness(vec![
            ScriptedLlm::tool_calls(vec![(
                "call_1",
                "saveDataAccessRequirements",
                json!({"company_name": "Acme Inc", "data_access_needs": "CRM read-only"}),
            )]),
            ScriptedLlm::failure("timeout"),
        ]);

        let result = h.agent.run_turn(&[ChatMessage::user("CRM read-only")]).await;
        assert!(result.is_err());
        let session = h.store.get("s1").await.unwrap().unwrap();
        assert_eq!(session.data_access_needs.as_deref(), Some("CRM read-only"));
    }

    #[tokio::test]
    async fn system_prompt_sent_once_and_embeds_session() {
        let h = harness(vec![ScriptedLlm::text("Hello")]);
        let history = vec![
            ChatMessage::assistant("Welcome"),
            ChatMessage::user("Hi"),
        ];
        h.agent.run_turn(&history).await.unwrap();

        let sent = &h.llm.requests()[0].messages;
        assert_eq!(sent.iter().filter(|m| m.role == Role::System).count(), 1);
        assert!(sent[0].content.contains("session_id=\"s1\""));
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn llm_spans_carry_estimated_tokens() {
        let h = harness(vec![ScriptedLlm::text("two words")]);
        h.agent.run_turn(&[ChatMessage::user("Hi")]).await.unwrap();

        let spans = h.sink.spans_of(SpanKind::LlmCall);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].output_tokens, Some(2));
        assert!(spans[0].input_tokens.unwrap() > 1);
        assert_eq!(spans[0].cost_usd, Some(Decimal::ZERO));
        assert_eq!(spans[0].metadata["phase"], "initial");
    }
}
