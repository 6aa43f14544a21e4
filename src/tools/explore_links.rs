use async_trait::async_trait;
use serde_json::Value;

use super::schema::{object_schema, string_prop};
use super::{require_str, Tool, ToolContext, ToolResult};
use crate::crawler::LinkExplorer;
use crate::ingest::ComponentMap;

/// Enrich components by fetching the pages their links point at.
pub struct ExploreLinksTool;

#[async_trait]
impl Tool for ExploreLinksTool {
    fn name(&self) -> &'static str {
        "explore_links"
    }

    fn description(&self) -> &'static str {
        "Explores hyperlinks in components to gather additional context"
    }

    fn parameters(&self) -> Value {
        object_schema()
            .property(
                "components",
                string_prop("JSON object of components, as returned by extract_components"),
                true,
            )
            .build()
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> ToolResult {
        let components_json = match require_str(&args, "components") {
            Ok(json) => json,
            Err(err) => return ToolResult::error(err),
        };
        let mut components: ComponentMap = match serde_json::from_str(components_json) {
            Ok(components) => components,
            Err(err) => return ToolResult::error(format!("parsing components: {err}")),
        };

        let explorer = match LinkExplorer::new() {
            Ok(explorer) => explorer,
            Err(err) => return ToolResult::error(err),
        };
        explorer.explore(&mut components).await;

        match serde_json::to_string(&components) {
            Ok(json) => ToolResult::success(json),
            Err(err) => ToolResult::error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests_support::test_context;
    use serde_json::json;

    #[tokio::test]
    async fn test_components_without_links_round_trip() {
        let ctx = test_context();
        let components = r#"{"Database": {"fields": {"description": "stores keys"}}}"#;
        let result = ExploreLinksTool
            .execute(&ctx, json!({"components": components}))
            .await;

        assert!(!result.is_error);
        let parsed: ComponentMap = serde_json::from_str(&result.content).unwrap();
        assert_eq!(parsed["Database"].fields["description"], "stores keys");
    }

    #[tokio::test]
    async fn test_malformed_components_json_is_an_error() {
        let ctx = test_context();
        let result = ExploreLinksTool
            .execute(&ctx, json!({"components": "not json"}))
            .await;
        assert!(result.is_error);
    }
}
