//! Centralized prompt definitions
//!
//! All prompts sent to the LLM live here so their wording is reviewable in
//! one place.

use serde_json::Value;

/// System prompt for the component-to-entity mapping step
pub const MAPPING_SYSTEM_PROMPT: &str =
    "You are a precise mapping assistant, expert in computer system security.";

/// System prompt for unstructured-text extraction
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a security analyst extracting cryptographic \
    properties from technical documentation. Respond only with a JSON object matching the \
    requested schema. Use empty arrays for categories with no findings; never invent items \
    that are not present in the text.";

/// Instructions for the function-calling analysis agent
pub const AGENT_INSTRUCTIONS: &str = "\
You are a quantum risk assessment specialist. Your task is to:
1. Extract and analyze components from technical documents
2. Map them to known quantum-vulnerable entities
3. Assess their risk levels
4. Generate comprehensive reports

Use the available functions to complete these tasks systematically.
Always validate your results before finalizing, and finish by reporting
the path of the generated risk report.";

/// Build the user prompt for mapping components to knowledge-graph entities
pub fn mapping_prompt(components: &Value, entities: &[String], additional_context: &Value) -> String {
    format!(
        "You are given a set of components (with descriptions) and a list of known entities, \
         and some optional additional context. Map each component to the most likely matching \
         entity name.\n\n\
         Components:\n{components}\n\n\
         Entities:\n{entities}\n\n\
         Additional context:\n{context}\n\n\
         Return only JSON of the form:\n{{ \"component_name\": \"entity_name\", ... }}",
        components = serde_json::to_string_pretty(components).unwrap_or_default(),
        entities = serde_json::to_string_pretty(entities).unwrap_or_default(),
        context = serde_json::to_string_pretty(additional_context).unwrap_or_default(),
    )
}

/// Build the per-chunk prompt for security-property extraction
pub fn extraction_prompt(chunk: &str) -> String {
    format!(
        "Extract the security properties mentioned in the following document excerpt. \
         Return a JSON object with these keys, each an array:\n\
         - \"encryption_algorithms\", \"protocols\", \"certificates\", \"key_lifetimes\", \
           \"key_distribution\", \"authorization\": arrays of \
           {{\"name\": string, \"context\": string or null}}\n\
         - \"further_references\": array of {{\"topic\": string, \"reference\": string}}\n\n\
         Excerpt:\n{chunk}"
    )
}

/// Build the user goal handed to the agent mode
pub fn agent_goal(document_path: &str) -> String {
    format!(
        "Please analyze the design document at {document_path} for quantum vulnerabilities \
         and generate a risk report."
    )
}

/// Build the planning prompt for planner mode
pub fn planner_prompt(document_path: &str, tool_listing: &str) -> String {
    format!(
        "Plan an analysis of the design document at {document_path} for quantum computing \
         vulnerabilities:\n\
         1. Extract all technical components from the document\n\
         2. Extract the full text with links for context\n\
         3. Enrich components by exploring their links\n\
         4. Map components to the knowledge graph entities\n\
         5. Assess quantum risks for all mapped components\n\
         6. Generate a comprehensive risk report\n\
         7. Validate the results\n\n\
         Available tools:\n{tool_listing}\n\n\
         Return only JSON of the form:\n\
         {{\"steps\": [{{\"tool\": \"tool_name\", \"params\": {{...}}}}, ...]}}\n\n\
         In a step's params, the string \"$stepN\" refers to the full output of step N \
         (1-based). Use it to feed earlier results into later steps."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_prompt_embeds_inputs() {
        let components = json!({"TLS Handshake": {"description": "setup"}});
        let entities = vec!["TLS 1.2".to_string()];
        let prompt = mapping_prompt(&components, &entities, &json!({}));
        assert!(prompt.contains("TLS Handshake"));
        assert!(prompt.contains("TLS 1.2"));
        assert!(prompt.contains("Return only JSON"));
    }

    #[test]
    fn test_planner_prompt_mentions_placeholder_convention() {
        let prompt = planner_prompt("doc.md", "- extract_components");
        assert!(prompt.contains("$stepN"));
        assert!(prompt.contains("doc.md"));
    }
}
