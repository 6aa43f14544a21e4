use async_trait::async_trait;
use serde_json::Value;

use super::schema::{object_schema, string_prop};
use super::{require_str, Tool, ToolContext, ToolResult};
use crate::ingest;

/// Extract a document's text content with links preserved inline.
pub struct ExtractTextTool;

#[async_trait]
impl Tool for ExtractTextTool {
    fn name(&self) -> &'static str {
        "extract_document_text"
    }

    fn description(&self) -> &'static str {
        "Extracts text content with embedded hyperlinks from a design document"
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
        match std::fs::read_to_string(path) {
            Ok(text) => ToolResult::success(ingest::extract_text(&text)),
            Err(err) => ToolResult::error(format!("reading {path}: {err}")),
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
    async fn test_text_keeps_links_in_markdown_form() {
        let mut file = tempfile::NamedTempFile::with_suffix(".md").unwrap();
        writeln!(file, "See [the RFC](https://example.com/rfc) for details.").unwrap();

        let ctx = test_context();
        let result = ExtractTextTool
            .execute(&ctx, json!({"document_path": file.path()}))
            .await;

        assert!(!result.is_error);
        assert!(result.content.contains("[the RFC](https://example.com/rfc)"));
    }
}
