use async_trait::async_trait;
use serde_json::Value;

use super::schema::{object_schema, string_prop};
use super::{optional_str, require_str, Tool, ToolContext, ToolResult};
use crate::ingest::ComponentMap;
use crate::llm::mapper;

/// Map components to entities in the quantum vulnerability knowledge graph.
pub struct MapEntitiesTool;

#[async_trait]
impl Tool for MapEntitiesTool {
    fn name(&self) -> &'static str {
        "map_to_knowledge_graph"
    }

    fn description(&self) -> &'static str {
        "Maps components to entities in the quantum vulnerability knowledge graph"
    }

    fn parameters(&self) -> Value {
        object_schema()
            .property(
                "components",
                string_prop("JSON object of components to map"),
                true,
            )
            .property(
                "context",
                string_prop("Additional context for mapping, as a JSON value"),
                false,
            )
            .build()
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let components_json = match require_str(&args, "components") {
            Ok(json) => json,
            Err(err) => return ToolResult::error(err),
        };
        let components: ComponentMap = match serde_json::from_str(components_json) {
            Ok(components) => components,
            Err(err) => return ToolResult::error(format!("parsing components: {err}")),
        };
        let additional_context = optional_str(&args, "context")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null);

        let entities = ctx.graph.entity_names();
        match mapper::map_components(&ctx.client, &components, &entities, &additional_context).await
        {
            Ok(mapping) => match serde_json::to_string(&mapping) {
                Ok(json) => ToolResult::success(json),
                Err(err) => ToolResult::error(err),
            },
            Err(err) => ToolResult::error(format!("{err:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests_support::test_context;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_components_map_without_calling_the_model() {
        let ctx = test_context();
        let result = MapEntitiesTool
            .execute(&ctx, json!({"components": "{}"}))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.content, "{}");
    }

    #[tokio::test]
    async fn test_missing_components_argument_is_an_error() {
        let ctx = test_context();
        let result = MapEntitiesTool.execute(&ctx, json!({})).await;
        assert!(result.is_error);
        assert!(result.content.contains("components"));
    }
}
