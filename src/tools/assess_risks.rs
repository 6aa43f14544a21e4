use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::schema::{object_schema, string_prop};
use super::{require_str, Tool, ToolContext, ToolResult};
use crate::assess;

/// Assess quantum computing risks for mapped components.
pub struct AssessRisksTool;

#[async_trait]
impl Tool for AssessRisksTool {
    fn name(&self) -> &'static str {
        "assess_risks"
    }

    fn description(&self) -> &'static str {
        "Assesses quantum computing risks for mapped components"
    }

    fn parameters(&self) -> Value {
        object_schema()
            .property(
                "mapping",
                string_prop("JSON mapping of component names to entity names"),
                true,
            )
            .build()
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let mapping_json = match require_str(&args, "mapping") {
            Ok(json) => json,
            Err(err) => return ToolResult::error(err),
        };
        let mapping: BTreeMap<String, String> = match serde_json::from_str(mapping_json) {
            Ok(mapping) => mapping,
            Err(err) => return ToolResult::error(format!("parsing mapping: {err}")),
        };

        let results = assess::assess(&mapping, &ctx.graph);
        match serde_json::to_string(&results) {
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
    async fn test_assessment_reports_risk_levels() {
        let ctx = test_context();
        let mapping = r#"{"Transport": "TLS 1.2", "KEM": "Kyber-768"}"#;
        let result = AssessRisksTool
            .execute(&ctx, json!({"mapping": mapping}))
            .await;

        assert!(!result.is_error);
        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(parsed["Transport"]["risk_level"], "High");
        assert_eq!(parsed["KEM"]["risk_level"], "Low");
    }
}
