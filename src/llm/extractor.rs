//! LLM-backed extraction of security properties from document text
//!
//! Long documents are chunked and extracted concurrently, then the per-chunk
//! results are merged with duplicates removed.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::ingest::{chunk_text, DEFAULT_CHUNK_WORDS};
use crate::llm::client::{extract_json_object, LlmClient};
use crate::prompts;
use crate::security_properties::SecurityProperties;

/// Upper bound on chunk extractions in flight at once.
const MAX_CONCURRENT_CHUNKS: usize = 10;

/// Extract security properties from a full document text.
///
/// Each chunk is extracted independently; chunks whose responses fail to
/// parse are skipped with a warning so one bad completion does not sink the
/// rest of the document.
pub async fn extract_security_properties(
    client: &LlmClient,
    text: &str,
) -> Result<SecurityProperties> {
    let chunks = chunk_text(text, DEFAULT_CHUNK_WORDS);
    if chunks.is_empty() {
        return Ok(SecurityProperties::default());
    }
    debug!("extracting security properties from {} chunks", chunks.len());

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_CHUNKS));
    let tasks = chunks.into_iter().enumerate().map(|(index, chunk)| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .context("extraction semaphore closed")?;
            extract_chunk(client, index, &chunk).await
        }
    });

    merge_chunk_results(join_all(tasks).await)
}

/// Merge the per-chunk outcomes, dropping chunks that produced nothing and
/// surfacing the first hard failure.
fn merge_chunk_results(
    results: Vec<Result<Option<SecurityProperties>>>,
) -> Result<SecurityProperties> {
    let mut outputs = Vec::new();
    for result in results {
        if let Some(properties) = result? {
            outputs.push(properties);
        }
    }
    Ok(SecurityProperties::merge(outputs))
}

async fn extract_chunk(
    client: &LlmClient,
    index: usize,
    chunk: &str,
) -> Result<Option<SecurityProperties>> {
    let prompt = prompts::extraction_prompt(chunk);
    let response = client
        .chat(&prompt, Some(prompts::EXTRACTION_SYSTEM_PROMPT), Some(true))
        .await
        .with_context(|| format!("extracting properties from chunk {index}"))?;

    let raw = extract_json_object(&response).unwrap_or(&response);
    match serde_json::from_str::<SecurityProperties>(raw) {
        Ok(properties) => Ok(Some(properties)),
        Err(err) => {
            warn!("chunk {index} extraction response was not parseable: {err}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security_properties::ItemWithContext;

    fn chunk_with_protocol(name: &str) -> SecurityProperties {
        SecurityProperties {
            protocols: vec![ItemWithContext {
                name: name.to_string(),
                context: None,
            }],
            ..SecurityProperties::default()
        }
    }

    #[test]
    fn test_chunk_results_merge_with_duplicates_removed() {
        let results = vec![
            Ok(Some(chunk_with_protocol("TLS 1.2"))),
            Ok(None),
            Ok(Some(chunk_with_protocol("TLS 1.2"))),
            Ok(Some(chunk_with_protocol("SSH"))),
        ];
        let merged = merge_chunk_results(results).unwrap();
        let names: Vec<&str> = merged.protocols.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["TLS 1.2", "SSH"]);
    }

    #[test]
    fn test_a_failed_chunk_fails_the_extraction() {
        let results = vec![
            Ok(Some(chunk_with_protocol("TLS 1.2"))),
            Err(anyhow::anyhow!("request failed")),
        ];
        assert!(merge_chunk_results(results).is_err());
    }

    #[test]
    fn test_properties_parse_from_json_mode_response() {
        let response = r#"{
            "encryption_algorithms": [{"name": "RSA-2048", "context": "key exchange"}],
            "protocols": [{"name": "TLS 1.2", "context": null}],
            "further_references": [{"topic": "TLS", "reference": "RFC 5246"}]
        }"#;
        let properties: SecurityProperties = serde_json::from_str(response).unwrap();
        assert_eq!(properties.encryption_algorithms.len(), 1);
        assert_eq!(properties.protocols[0].name, "TLS 1.2");
        assert_eq!(properties.further_references[0].reference, "RFC 5246");
        assert!(properties.certificates.is_empty());
    }

    #[test]
    fn test_wrapped_response_still_parses() {
        let response = "Sure, here you go:\n{\"protocols\": [{\"name\": \"SSH\", \"context\": null}]}";
        let raw = extract_json_object(response).unwrap();
        let properties: SecurityProperties = serde_json::from_str(raw).unwrap();
        assert_eq!(properties.protocols[0].name, "SSH");
    }
}
