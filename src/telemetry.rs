//! Best-effort telemetry: timed spans for model calls, tool calls, and
//! retrievals, handed to an injected sink.
//!
//! The `Telemetry` handle is the only way spans leave the crate. It swallows
//! sink failures (logging them) so recording can never fail the operation
//! being observed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TelemetryError;

/// The kind of work a span represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    LlmCall,
    ToolExecution,
    Retrieval,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LlmCall => write!(f, "llm_call"),
            Self::ToolExecution => write!(f, "tool_execution"),
            Self::Retrieval => write!(f, "retrieval"),
        }
    }
}

/// A single timed record of one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub id: String,
    pub kind: SpanKind,
    /// Operation label: tool name, model name, or knowledge base.
    pub name: String,
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<Decimal>,
}

impl Span {
    pub fn new(kind: SpanKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            name: name.into(),
            input: serde_json::Value::Null,
            output: None,
            error: None,
            started_at: Utc::now(),
            duration_ms: 0,
            tags: Vec::new(),
            metadata: serde_json::Map::new(),
            input_tokens: None,
            output_tokens: None,
            cost_usd: None,
        }
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Close the span successfully.
    pub fn succeed(mut self, output: impl Into<String>, elapsed: Duration) -> Self {
        self.output = Some(output.into());
        self.duration_ms = elapsed.as_millis() as u64;
        self
    }

    /// Close the span with a fault; the span is tagged `error`.
    pub fn fail(mut self, error: impl Into<String>, elapsed: Duration) -> Self {
        self.error = Some(error.into());
        self.duration_ms = elapsed.as_millis() as u64;
        self.tags.push("error".to_string());
        self
    }

    pub fn record_tokens(mut self, input: u32, output: u32, cost: Decimal) -> Self {
        self.input_tokens = Some(input);
        self.output_tokens = Some(output);
        self.cost_usd = Some(cost);
        self
    }

    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.unwrap_or(0) + self.output_tokens.unwrap_or(0)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Approximate token count (whitespace-separated words).
pub fn approx_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Destination for finished spans. Write-only.
pub trait TelemetrySink: Send + Sync {
    fn name(&self) -> &str;

    fn record(&self, span: &Span) -> Result<(), TelemetryError>;
}

/// Sink that emits each span as a structured `tracing` event.
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn record(&self, span: &Span) -> Result<(), TelemetryError> {
        let payload = serde_json::to_string(span)?;
        tracing::info!(
            target: "telemetry",
            kind = %span.kind,
            name = %span.name,
            duration_ms = span.duration_ms,
            tokens = span.total_tokens(),
            error = span.is_error(),
            span = %payload,
            "span recorded"
        );
        Ok(())
    }
}

/// Sink that keeps spans in memory.
#[derive(Default)]
pub struct MemorySink {
    spans: Mutex<Vec<Span>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .unwrap_or_default()
    }

    pub fn spans_of(&self, kind: SpanKind) -> Vec<Span> {
        self.spans().into_iter().filter(|s| s.kind == kind).collect()
    }
}

impl TelemetrySink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn record(&self, span: &Span) -> Result<(), TelemetryError> {
        let mut spans = self.spans.lock().map_err(|_| TelemetryError::Rejected {
            sink: "memory".to_string(),
            reason: "span buffer poisoned".to_string(),
        })?;
        spans.push(span.clone());
        Ok(())
    }
}

/// Cheap, cloneable handle passed to every component that records spans.
#[derive(Clone, Default)]
pub struct Telemetry {
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl Telemetry {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// A handle that drops every span.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Hand a finished span to the sink. Never fails.
    pub fn record(&self, span: Span) {
        let Some(ref sink) = self.sink else {
            return;
        };
        if let Err(e) = sink.record(&span) {
            tracing::warn!(
                sink = sink.name(),
                span = %span.name,
                "Failed to record telemetry span: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }
        fn record(&self, _span: &Span) -> Result<(), TelemetryError> {
            Err(TelemetryError::Rejected {
                sink: "failing".into(),
                reason: "collector unreachable".into(),
            })
        }
    }

    #[test]
    fn failing_sink_is_swallowed() {
        let telemetry = Telemetry::new(Arc::new(FailingSink));
        // Must not panic or propagate.
        telemetry.record(Span::new(SpanKind::ToolExecution, "getOnboardingSummary"));
    }

    #[test]
    fn disabled_handle_drops_spans() {
        let telemetry = Telemetry::disabled();
        assert!(!telemetry.is_enabled());
        telemetry.record(Span::new(SpanKind::LlmCall, "gpt-4o-mini"));
    }

    #[test]
    fn memory_sink_collects_spans_by_kind() {
        let sink = Arc::new(MemorySink::new());
        let telemetry = Telemetry::new(sink.clone());
        telemetry.record(Span::new(SpanKind::LlmCall, "model"));
        telemetry.record(Span::new(SpanKind::Retrieval, "Company Database"));

        assert_eq!(sink.spans().len(), 2);
        assert_eq!(sink.spans_of(SpanKind::Retrieval)[0].name, "Company Database");
    }

    #[test]
    fn fail_tags_span() {
        let span = Span::new(SpanKind::Retrieval, "kb").fail("timeout", Duration::from_millis(7));
        assert!(span.is_error());
        assert_eq!(span.duration_ms, 7);
        assert!(span.tags.contains(&"error".to_string()));
    }

    #[test]
    fn token_accounting() {
        let span = Span::new(SpanKind::LlmCall, "m").record_tokens(10, 5, Decimal::ZERO);
        assert_eq!(span.total_tokens(), 15);
        assert_eq!(approx_tokens("three word phrase"), 3);
        assert_eq!(approx_tokens(""), 0);
    }

    #[test]
    fn tracing_sink_accepts_span() {
        let span = Span::new(SpanKind::ToolExecution, "lookupCompanyInformation")
            .with_input(serde_json::json!({"company_name": "Acme"}))
            .succeed("ok", Duration::from_millis(1));
        assert!(TracingSink.record(&span).is_ok());
    }
}
