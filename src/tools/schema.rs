//! JSON schema helpers for tool definitions

use serde_json::{json, Value};

/// Build a JSON schema object
pub fn object_schema() -> SchemaBuilder {
    SchemaBuilder::new("object")
}

/// Build a string property
pub fn string_prop(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}

/// Schema builder for tool definitions
pub struct SchemaBuilder {
    schema_type: String,
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    pub fn new(schema_type: &str) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    /// Add a property to the schema
    pub fn property(mut self, name: &str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Build the final schema
    pub fn build(self) -> Value {
        json!({
            "type": self.schema_type,
            "properties": self.properties,
            "required": self.required
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder_collects_required_properties() {
        let schema = object_schema()
            .property("document_path", string_prop("Path to the document"), true)
            .property("context", string_prop("Optional context"), false)
            .build();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["document_path"]));
        assert_eq!(
            schema["properties"]["context"]["description"],
            "Optional context"
        );
    }
}
