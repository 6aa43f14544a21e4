use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use super::schema::{object_schema, string_prop};
use super::{optional_str, require_str, Tool, ToolContext, ToolResult};
use crate::{assess, report};

/// Generate the Markdown risk assessment report.
pub struct GenerateReportTool;

#[async_trait]
impl Tool for GenerateReportTool {
    fn name(&self) -> &'static str {
        "generate_risk_report"
    }

    fn description(&self) -> &'static str {
        "Generates a markdown risk assessment report"
    }

    fn parameters(&self) -> Value {
        object_schema()
            .property(
                "mapping",
                string_prop("JSON mapping of component names to entity names"),
                true,
            )
            .property(
                "output_path",
                string_prop("Path for the report file (defaults to the report directory)"),
                false,
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

        let path = optional_str(&args, "output_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| ctx.report_dir.join("risk_report.md"));

        let results = assess::assess(&mapping, &ctx.graph);
        let content = report::render_report(&results, &ctx.graph, &[]);
        match report::write_report(&content, &path) {
            Ok(written) => ToolResult::success(written.display().to_string()),
            Err(err) => ToolResult::error(format!("{err:#}")),
        }
    }
}
