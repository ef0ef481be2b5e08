//! Tool trait, the closed set of vendor tool kinds, and execution context.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub use crate::error::ToolError;
use crate::telemetry::Telemetry;

/// The four vendor onboarding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    LookupCompanyInformation,
    SaveComplianceCertifications,
    SaveDataAccessRequirements,
    GetOnboardingSummary,
}

impl ToolKind {
    /// Declaration order, as offered to the model.
    pub const ALL: [ToolKind; 4] = [
        Self::LookupCompanyInformation,
        Self::SaveComplianceCertifications,
        Self::SaveDataAccessRequirements,
        Self::GetOnboardingSummary,
    ];

    /// Model-facing function name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LookupCompanyInformation => "lookupCompanyInformation",
            Self::SaveComplianceCertifications => "saveComplianceCertifications",
            Self::SaveDataAccessRequirements => "saveDataAccessRequirements",
            Self::GetOnboardingSummary => "getOnboardingSummary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Gerund used in fault text: `Error <action>: <message>`.
    pub fn action(&self) -> &'static str {
        match self {
            Self::LookupCompanyInformation => "looking up company information",
            Self::SaveComplianceCertifications => "saving compliance certifications",
            Self::SaveDataAccessRequirements => "saving data access requirements",
            Self::GetOnboardingSummary => "retrieving application summary",
        }
    }

    /// Render an execution fault as tool-result text.
    pub fn error_text(&self, error: &ToolError) -> String {
        format!("Error {}: {}", self.action(), error)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-call context handed to every tool.
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: String,
    pub telemetry: Telemetry,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>, telemetry: Telemetry) -> Self {
        Self {
            session_id: session_id.into(),
            telemetry,
        }
    }
}

/// Output from a tool execution. Timing is measured by the executor.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// A callable vendor operation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments, including the `required` list.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError>;
}

/// Deserialize tool arguments, mapping failures to `InvalidParameters`.
pub fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}
