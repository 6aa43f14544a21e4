use async_trait::async_trait;
use serde_json::Value;

use super::schema::{object_schema, string_prop};
use super::{require_str, Tool, ToolContext, ToolResult};

/// Sanity-check analysis results before they are handed back to the caller.
pub struct ValidateResultsTool;

#[async_trait]
impl Tool for ValidateResultsTool {
    fn name(&self) -> &'static str {
        "validate_results"
    }

    fn description(&self) -> &'static str {
        "Validates analysis results for completeness and accuracy"
    }

    fn parameters(&self) -> Value {
        object_schema()
            .property("results", string_prop("JSON results to validate"), true)
            .build()
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> ToolResult {
        let results_json = match require_str(&args, "results") {
            Ok(json) => json,
            Err(err) => return ToolResult::error(err),
        };
        let results: Value = match serde_json::from_str(results_json) {
            Ok(results) => results,
            Err(_) => return ToolResult::success("INVALID: Malformed JSON"),
        };
        ToolResult::success(verdict_for(&results))
    }
}

/// Verdict over parsed results, shared with the direct pipeline's final
/// validation step.
pub(crate) fn verdict_for(results: &Value) -> &'static str {
    if results.get("error").is_some() {
        return "INVALID: Error in results";
    }
    let empty = match results {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    if empty {
        return "INVALID: Empty results";
    }
    "VALID"
}
