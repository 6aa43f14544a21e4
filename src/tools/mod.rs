//! Tool system exposed to the LLM for agent and planner modes
//!
//! Each tool wraps one step of the analysis pipeline behind a JSON-schema
//! function definition. Tool arguments and results are JSON strings so the
//! same tools serve OpenAI function calling and the planner's step plans.

mod assess_risks;
mod explore_links;
mod extract_components;
mod extract_text;
mod generate_report;
mod map_entities;
mod schema;
mod validate_results;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use assess_risks::AssessRisksTool;
pub use explore_links::ExploreLinksTool;
pub use extract_components::ExtractComponentsTool;
pub use extract_text::ExtractTextTool;
pub use generate_report::GenerateReportTool;
pub use map_entities::MapEntitiesTool;
pub use validate_results::ValidateResultsTool;
pub(crate) use validate_results::verdict_for;

use crate::graph::KnowledgeGraph;
use crate::llm::types::ToolDefinition;
use crate::llm::LlmClient;

/// Shared state every tool executes against
pub struct ToolContext {
    pub graph: Arc<KnowledgeGraph>,
    pub client: Arc<LlmClient>,
    pub report_dir: PathBuf,
}

/// Outcome of a tool execution, fed back to the model verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: format!("Error: {message}"),
            is_error: true,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> Value;
    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult;
}

/// Registry of available tools
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create a full registry with all analysis tools
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(Arc::new(ExtractComponentsTool));
        registry.register(Arc::new(ExtractTextTool));
        registry.register(Arc::new(ExploreLinksTool));
        registry.register(Arc::new(MapEntitiesTool));
        registry.register(Arc::new(AssessRisksTool));
        registry.register(Arc::new(GenerateReportTool));
        registry.register(Arc::new(ValidateResultsTool));

        registry
    }

    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Tools in registration order
    pub fn values(&self) -> impl Iterator<Item = &dyn Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.as_ref())
    }

    /// Function definitions for the chat completions API
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.values()
            .map(|tool| {
                ToolDefinition::function(tool.name(), tool.description(), tool.parameters())
            })
            .collect()
    }

    /// Plain-text listing for the planner prompt
    pub fn listing(&self) -> String {
        self.values()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull a required string argument out of a tool's JSON arguments.
fn require_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, String> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required argument: {name}"))
}

/// Optional string argument, treating empty strings as absent.
fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use crate::graph::test_fixtures::seeded_graph;

    /// Context over the seeded graph with an offline client, for tool tests
    /// that never reach the network.
    pub(crate) fn test_context() -> ToolContext {
        ToolContext {
            graph: Arc::new(seeded_graph()),
            client: Arc::new(LlmClient::offline_for_tests()),
            report_dir: std::env::temp_dir().join("quantgpt-tool-tests"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_contains_all_analysis_tools() {
        let registry = ToolRegistry::new();
        let names: Vec<&str> = registry.values().map(|t| t.name()).collect();
        assert_eq!(
            names,
            [
                "extract_components",
                "extract_document_text",
                "explore_links",
                "map_to_knowledge_graph",
                "assess_risks",
                "generate_risk_report",
                "validate_results",
            ]
        );
    }

    #[test]
    fn test_definitions_expose_function_schemas() {
        let registry = ToolRegistry::new();
        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 7);
        for definition in &definitions {
            assert_eq!(definition.def_type, "function");
            assert_eq!(definition.function.parameters["type"], "object");
        }
    }

    #[test]
    fn test_listing_names_every_tool() {
        let listing = ToolRegistry::new().listing();
        assert!(listing.contains("- extract_components:"));
        assert!(listing.contains("- validate_results:"));
    }

    #[test]
    fn test_require_str_rejects_missing_and_empty() {
        let args = json!({"document_path": "", "other": 3});
        assert!(require_str(&args, "document_path").is_err());
        assert!(require_str(&args, "absent").is_err());
        assert!(require_str(&json!({"p": "x"}), "p").is_ok());
    }
}
