//! Tool registry: the fixed kind → handler table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::llm::ToolDefinition;
use crate::onboarding::SessionStore;
use crate::retrieval::Retriever;
use crate::tools::builtin::{
    LookupCompanyTool, OnboardingSummaryTool, SaveComplianceTool, SaveDataAccessTool,
};
use crate::tools::tool::{Tool, ToolError, ToolKind};

/// Registry of the vendor tools, keyed by kind.
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// The four onboarding tools wired to one store and one retriever.
    pub fn vendor(store: Arc<dyn SessionStore>, retriever: Arc<Retriever>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LookupCompanyTool::new(retriever, store.clone())));
        registry.register(Arc::new(SaveComplianceTool::new(store.clone())));
        registry.register(Arc::new(SaveDataAccessTool::new(store.clone())));
        registry.register(Arc::new(OnboardingSummaryTool::new(store)));
        registry
    }

    /// Register a handler, replacing any previous handler of the same kind.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let kind = tool.kind();
        if self.tools.insert(kind, tool).is_some() {
            tracing::warn!(tool = %kind, "Replaced existing tool handler");
        } else {
            tracing::debug!("Registered tool: {}", kind);
        }
    }

    /// Resolve a model-supplied name to its kind and handler.
    pub fn resolve(&self, name: &str) -> Result<(ToolKind, Arc<dyn Tool>), ToolError> {
        let not_found = || ToolError::NotFound {
            name: name.to_string(),
        };
        let kind = ToolKind::from_name(name).ok_or_else(not_found)?;
        let tool = self.tools.get(&kind).cloned().ok_or_else(not_found)?;
        Ok((kind, tool))
    }

    pub fn has(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Tool definitions for LLM function calling, in declaration order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        ToolKind::ALL
            .iter()
            .filter_map(|kind| self.tools.get(kind))
            .map(|tool| ToolDefinition {
                name: tool.kind().name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
