use async_trait::async_trait;
use serde_json::Value;

use super::schema::{object_schema, string_prop};
use super::{require_str, Tool, ToolContext, ToolResult};
use crate::ingest;

/// Extract the component inventory from a design document.
pub struct ExtractComponentsTool;

#[async_trait]
impl Tool for ExtractComponentsTool {
    fn name(&self) -> &'static str {
        "extract_components"
    }

    fn description(&self) -> &'static str {
        "Extracts technical components from a design document"
    }

    fn parameters(&self) -> Value {
        object_schema()
            .property(
                "document_path",
                string_prop("Path to the Markdown design document"),
                true,
            )
            .build()
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> ToolResult {
        let path = match require_str(&args, "document_path") {
            Ok(path) => path,
            Err(err) => return ToolResult::error(err),
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => return ToolResult::error(format!("reading {path}: {err}")),
        };
        let components = ingest::extract_components(&text);
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
    use std::io::Write;

    #[tokio::test]
    async fn test_extracts_components_from_markdown_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".md").unwrap();
        writeln!(
            file,
            "| Component | Description |\n|---|---|\n| TLS Handshake | Session setup |"
        )
        .unwrap();

        let ctx = test_context();
        let result = ExtractComponentsTool
            .execute(&ctx, json!({"document_path": file.path()}))
            .await;

        assert!(!result.is_error);
        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert!(parsed.get("TLS Handshake").is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let ctx = test_context();
        let result = ExtractComponentsTool
            .execute(&ctx, json!({"document_path": "/no/such/file.md"}))
            .await;
        assert!(result.is_error);
    }
}
