//! Tool executor: name → handler dispatch with session injection and spans.
//!
//! `execute` never fails. Unknown names and execution faults come back as
//! text for the model to read, and every call leaves a tool span behind.

use std::sync::Arc;
use std::time::Instant;

use crate::telemetry::{Span, SpanKind, Telemetry};
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::{ToolContext, ToolError};

const SESSION_ID_KEY: &str = "session_id";

/// Dispatches model tool calls to the registry.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run one tool call for `session_id` and return its result text.
    pub async fn execute(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
        session_id: &str,
        telemetry: &Telemetry,
    ) -> String {
        let start = Instant::now();
        let params = with_session_id(arguments, session_id);
        let span = Span::new(SpanKind::ToolExecution, tool_name)
            .with_input(params.clone())
            .with_metadata(SESSION_ID_KEY, session_id)
            .with_tag("tool");

        let (kind, tool) = match self.registry.resolve(tool_name) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(tool = %tool_name, session_id = %session_id, "{}", e);
                let text = format!("Unknown tool: {}", tool_name);
                telemetry.record(span.fail(e.to_string(), start.elapsed()));
                return text;
            }
        };

        tracing::debug!(
            tool = %kind,
            params = %params,
            session_id = %session_id,
            "Tool call started"
        );

        let ctx = ToolContext::new(session_id, telemetry.clone());
        let result = if params.is_object() {
            tool.execute(params, &ctx).await
        } else {
            Err(ToolError::InvalidParameters(format!(
                "expected a JSON object, got {}",
                params
            )))
        };
        let elapsed = start.elapsed();

        match result {
            Ok(output) => {
                tracing::debug!(
                    tool = %kind,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Tool call succeeded"
                );
                telemetry.record(
                    span.with_metadata("tool_kind", kind.to_string())
                        .succeed(output.content.clone(), elapsed),
                );
                output.content
            }
            Err(e) => {
                tracing::warn!(
                    tool = %kind,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Tool call failed"
                );
                let text = kind.error_text(&e);
                telemetry.record(
                    span.with_metadata("tool_kind", kind.to_string())
                        .fail(e.to_string(), elapsed),
                );
                text
            }
        }
    }
}

/// Copy of `arguments` with `session_id` filled in when missing or blank.
/// Non-object payloads are returned unchanged.
fn with_session_id(arguments: &serde_json::Value, session_id: &str) -> serde_json::Value {
    let mut params = arguments.clone();
    if let Some(map) = params.as_object_mut() {
        let missing = match map.get(SESSION_ID_KEY) {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            map.insert(
                SESSION_ID_KEY.to_string(),
                serde_json::Value::String(session_id.to_string()),
            );
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::{InMemorySessionStore, SessionStore};
    use crate::retrieval::testing::{FailingIndex, StaticIndex, retriever};
    use crate::telemetry::MemorySink;
    use serde_json::json;

    fn executor_with(
        index: impl crate::retrieval::VectorIndex + 'static,
    ) -> (ToolExecutor, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let registry = ToolRegistry::vendor(store.clone(), Arc::new(retriever(index)));
        (ToolExecutor::new(Arc::new(registry)), store)
    }

    fn recording() -> (Telemetry, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Telemetry::new(sink.clone()), sink)
    }

    #[test]
    fn session_id_injected_only_when_missing() {
        assert_eq!(
            with_session_id(&json!({"company_name": "Acme"}), "s1")["session_id"],
            "s1"
        );
        assert_eq!(with_session_id(&json!({"session_id": ""}), "s1")["session_id"], "s1");
        assert_eq!(
            with_session_id(&json!({"session_id": "other"}), "s1")["session_id"],
            "other"
        );
        assert_eq!(with_session_id(&json!("text"), "s1"), json!("text"));
    }

    #[tokio::test]
    async fn unknown_tool_is_soft_reply_with_error_span() {
        let (executor, _store) = executor_with(StaticIndex::empty());
        let (telemetry, sink) = recording();

        let text = executor
            .execute("approveVendor", &json!({}), "s1", &telemetry)
            .await;
        assert_eq!(text, "Unknown tool: approveVendor");

        let spans = sink.spans_of(SpanKind::ToolExecution);
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_error());
    }

    #[tokio::test]
    async fn injects_session_and_records_span() {
        let (executor, store) = executor_with(StaticIndex::new(&["Acme record"]));
        let (telemetry, sink) = recording();

        let text = executor
            .execute(
                "lookupCompanyInformation",
                &json!({"company_name": "Acme Inc"}),
                "s9",
                &telemetry,
            )
            .await;
        assert_eq!(text, "Acme record");
        assert!(store.get("s9").await.unwrap().unwrap().company_lookup_complete);

        let tool_spans = sink.spans_of(SpanKind::ToolExecution);
        assert_eq!(tool_spans.len(), 1);
        assert_eq!(tool_spans[0].name, "lookupCompanyInformation");
        assert_eq!(tool_spans[0].input["session_id"], "s9");
        assert_eq!(tool_spans[0].output.as_deref(), Some("Acme record"));
        // The lookup's retrieval shows up as its own span.
        assert_eq!(sink.spans_of(SpanKind::Retrieval).len(), 1);
    }

    #[tokio::test]
    async fn malformed_arguments_become_error_text() {
        let (executor, store) = executor_with(StaticIndex::empty());
        let (telemetry, sink) = recording();

        let text = executor
            .execute(
                "saveComplianceCertifications",
                &json!({"company_name": "Acme Inc"}),
                "s1",
                &telemetry,
            )
            .await;
        assert!(
            text.starts_with("Error saving compliance certifications: Invalid parameters:"),
            "{text}"
        );
        assert!(store.get("s1").await.unwrap().is_none());
        assert!(sink.spans_of(SpanKind::ToolExecution)[0].is_error());
    }

    #[tokio::test]
    async fn non_object_arguments_become_error_text() {
        let (executor, _store) = executor_with(StaticIndex::empty());
        let text = executor
            .execute(
                "getOnboardingSummary",
                &json!("{not json"),
                "s1",
                &Telemetry::disabled(),
            )
            .await;
        assert!(text.starts_with("Error retrieving application summary: Invalid parameters:"));
    }

    #[tokio::test]
    async fn retrieval_fault_does_not_fail_lookup() {
        let (executor, store) = executor_with(FailingIndex);
        let (telemetry, sink) = recording();

        let text = executor
            .execute(
                "lookupCompanyInformation",
                &json!({"company_name": "Acme Inc", "country": "US"}),
                "s1",
                &telemetry,
            )
            .await;
        assert_eq!(
            text,
            "Nothing found for company information for Acme Inc incorporated in US"
        );
        assert!(store.get("s1").await.unwrap().is_some());
        assert!(sink.spans_of(SpanKind::Retrieval)[0].is_error());
        assert!(!sink.spans_of(SpanKind::ToolExecution)[0].is_error());
    }
}
