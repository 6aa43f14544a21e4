//! Component to knowledge-graph entity mapping
//!
//! Asks the model to match each extracted component against the entity names
//! loaded from the knowledge graph. The model returns a flat JSON object of
//! `{"component_name": "entity_name"}` pairs.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ingest::ComponentMap;
use crate::llm::client::{extract_json_object, LlmClient};
use crate::prompts;

/// Map components onto knowledge-graph entity names.
///
/// `additional_context` carries whatever enrichment is available, typically
/// the link snippets gathered by the crawler. A response that cannot be
/// parsed as a JSON object yields an empty mapping rather than an error so
/// the pipeline can still report the components it failed to map.
pub async fn map_components(
    client: &LlmClient,
    components: &ComponentMap,
    entities: &[String],
    additional_context: &Value,
) -> Result<BTreeMap<String, String>> {
    if components.is_empty() || entities.is_empty() {
        return Ok(BTreeMap::new());
    }

    let components_json =
        serde_json::to_value(components).context("serializing components for mapping")?;
    let prompt = prompts::mapping_prompt(&components_json, entities, additional_context);

    let response = client
        .chat(&prompt, Some(prompts::MAPPING_SYSTEM_PROMPT), Some(true))
        .await
        .context("requesting component mapping")?;

    Ok(parse_mapping(&response, components, entities))
}

/// Parse the model's mapping response, keeping only pairs that name a real
/// component and a real entity.
fn parse_mapping(
    response: &str,
    components: &ComponentMap,
    entities: &[String],
) -> BTreeMap<String, String> {
    let raw = extract_json_object(response).unwrap_or(response);
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("mapping response was not valid JSON: {err}");
            return BTreeMap::new();
        }
    };

    let Some(object) = value.as_object() else {
        warn!("mapping response was not a JSON object");
        return BTreeMap::new();
    };

    let mut mapping = BTreeMap::new();
    for (component, entity) in object {
        let Some(entity) = entity.as_str() else {
            continue;
        };
        if !components.contains_key(component) {
            debug!("dropping mapping for unknown component {component:?}");
            continue;
        }
        if !entities.iter().any(|known| known == entity) {
            debug!("dropping mapping to unknown entity {entity:?}");
            continue;
        }
        mapping.insert(component.clone(), entity.to_string());
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Component;

    fn components_named(names: &[&str]) -> ComponentMap {
        names
            .iter()
            .map(|name| (name.to_string(), Component::default()))
            .collect()
    }

    #[test]
    fn test_parse_mapping_keeps_known_pairs() {
        let components = components_named(&["TLS Handshake", "Session Keys"]);
        let entities = vec!["TLS 1.2".to_string(), "AES-128".to_string()];
        let mapping = parse_mapping(
            r#"{"TLS Handshake": "TLS 1.2", "Session Keys": "AES-128"}"#,
            &components,
            &entities,
        );
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["TLS Handshake"], "TLS 1.2");
    }

    #[test]
    fn test_parse_mapping_drops_unknown_names() {
        let components = components_named(&["TLS Handshake"]);
        let entities = vec!["TLS 1.2".to_string()];
        let mapping = parse_mapping(
            r#"{"TLS Handshake": "TLS 1.3", "Phantom": "TLS 1.2"}"#,
            &components,
            &entities,
        );
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_parse_mapping_tolerates_prose_wrapper() {
        let components = components_named(&["TLS Handshake"]);
        let entities = vec!["TLS 1.2".to_string()];
        let mapping = parse_mapping(
            "Here is the mapping:\n{\"TLS Handshake\": \"TLS 1.2\"}\nDone.",
            &components,
            &entities,
        );
        assert_eq!(mapping["TLS Handshake"], "TLS 1.2");
    }

    #[test]
    fn test_parse_mapping_invalid_json_is_empty() {
        let components = components_named(&["TLS Handshake"]);
        let entities = vec!["TLS 1.2".to_string()];
        assert!(parse_mapping("not json at all", &components, &entities).is_empty());
    }
}
