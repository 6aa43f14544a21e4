//! Design document ingestion
//!
//! Technical design documents arrive as Markdown (or plain text). Component
//! inventories live in tables whose header row contains a "Component"
//! column; every data row becomes a [`Component`] keyed by that cell, with
//! the remaining cells stored under their lowercased header labels and any
//! inline links collected for later crawling.

use std::collections::BTreeMap;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// Default word budget for a text chunk
pub const DEFAULT_CHUNK_WORDS: usize = 500;

/// One component row extracted from a design document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    /// Nearest heading above the table the row came from
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub section: Option<String>,
    /// Remaining table cells, keyed by lowercased header label
    pub fields: BTreeMap<String, String>,
    /// Hyperlinks found in the row
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub links: Vec<String>,
    /// Crawler findings for each link, filled in by enrichment
    #[serde(
        rename = "info_found_in_link",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    pub link_info: Vec<LinkInfo>,
}

/// What the crawler found behind one link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Components keyed by name; later rows with the same name win
pub type ComponentMap = BTreeMap<String, Component>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TablePhase {
    Head,
    Body,
}

/// Extract the component inventory from Markdown text
pub fn extract_components(text: &str) -> ComponentMap {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES);

    let mut components = ComponentMap::new();
    let mut section: Option<String> = None;
    let mut heading_text: Option<String> = None;

    let mut phase: Option<TablePhase> = None;
    let mut header: Vec<String> = Vec::new();
    let mut component_pos: Option<usize> = None;
    let mut row: Vec<String> = Vec::new();
    let mut row_links: Vec<String> = Vec::new();
    let mut cell: Option<String> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => heading_text = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => {
                section = heading_text.take().map(|t| t.trim().to_string());
            }

            Event::Start(Tag::Table(_)) => {
                header.clear();
                component_pos = None;
            }
            Event::Start(Tag::TableHead) => phase = Some(TablePhase::Head),
            Event::End(TagEnd::TableHead) => {
                component_pos = header
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case("component"));
                phase = Some(TablePhase::Body);
            }
            Event::End(TagEnd::Table) => phase = None,

            Event::Start(Tag::TableRow) => {
                row.clear();
                row_links.clear();
            }
            Event::End(TagEnd::TableRow) => {
                if phase == Some(TablePhase::Body) {
                    if let Some(pos) = component_pos {
                        record_row(&mut components, &header, pos, &row, &row_links, &section);
                    }
                }
            }
            Event::Start(Tag::TableCell) => cell = Some(String::new()),
            Event::End(TagEnd::TableCell) => {
                let text = cell.take().unwrap_or_default().trim().to_string();
                match phase {
                    Some(TablePhase::Head) => header.push(text.to_lowercase()),
                    _ => row.push(text),
                }
            }

            Event::Start(Tag::Link { dest_url, .. }) => {
                if phase == Some(TablePhase::Body) {
                    row_links.push(dest_url.to_string());
                }
            }

            Event::Text(t) | Event::Code(t) => {
                if let Some(buf) = cell.as_mut() {
                    buf.push_str(&t);
                } else if let Some(buf) = heading_text.as_mut() {
                    buf.push_str(&t);
                }
            }
            _ => {}
        }
    }

    components
}

fn record_row(
    components: &mut ComponentMap,
    header: &[String],
    component_pos: usize,
    row: &[String],
    links: &[String],
    section: &Option<String>,
) {
    let Some(name) = row.get(component_pos).filter(|c| !c.is_empty()) else {
        return;
    };

    let mut fields = BTreeMap::new();
    for (i, value) in row.iter().enumerate() {
        if i == component_pos || value.is_empty() {
            continue;
        }
        let label = header
            .get(i)
            .filter(|h| !h.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("col{}", i));
        fields.insert(label, value.clone());
    }

    components.insert(
        name.clone(),
        Component {
            section: section.clone(),
            fields,
            links: links.to_vec(),
            link_info: Vec::new(),
        },
    );
}

/// Plain text of the document with link destinations preserved inline
pub fn extract_text(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES);

    let mut out = String::new();
    let mut link_dest: Option<String> = None;
    let mut link_text = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::Link { dest_url, .. }) => {
                link_dest = Some(dest_url.to_string());
                link_text.clear();
            }
            Event::End(TagEnd::Link) => {
                if let Some(dest) = link_dest.take() {
                    out.push_str(&format!("[{}]({})", link_text, dest));
                }
            }
            Event::Text(t) | Event::Code(t) => {
                if link_dest.is_some() {
                    link_text.push_str(&t);
                } else {
                    out.push_str(&t);
                }
            }
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::Table,
            ) => out.push_str("\n\n"),
            Event::End(TagEnd::TableCell) => out.push(' '),
            Event::End(TagEnd::TableRow | TagEnd::TableHead) => out.push('\n'),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

/// Split text into chunks of at most `max_words` words, at paragraph
/// boundaries. A single paragraph over the budget still becomes its own
/// chunk.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0usize;

    for para in text.split("\n\n") {
        let words = para.split_whitespace().count();
        if current_words + words > max_words && !current.is_empty() {
            chunks.push(current.join("\n\n"));
            current.clear();
            current_words = 0;
        }
        current.push(para);
        current_words += words;
    }

    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"# Transport Layer

Traffic between services is encrypted in transit.

| Component | Description | Reference |
|-----------|-------------|-----------|
| TLS Handshake | secure communication setup | [RFC 5246](https://example.com/rfc5246) |
| Kyber-768 | post-quantum key exchange | |
| | ghost row without a name | |

## Storage

| Name | Purpose |
|------|---------|
| Vault | secret storage |
"#;

    #[test]
    fn test_extract_components() {
        let components = extract_components(DOC);
        assert_eq!(components.len(), 2);

        let tls = &components["TLS Handshake"];
        assert_eq!(tls.section.as_deref(), Some("Transport Layer"));
        assert_eq!(tls.fields["description"], "secure communication setup");
        assert_eq!(tls.links, vec!["https://example.com/rfc5246"]);

        let kyber = &components["Kyber-768"];
        assert_eq!(kyber.fields["description"], "post-quantum key exchange");
        assert!(kyber.links.is_empty());
    }

    #[test]
    fn test_tables_without_component_header_ignored() {
        let components = extract_components(DOC);
        assert!(!components.contains_key("Vault"));
    }

    #[test]
    fn test_duplicate_component_rows_overwrite() {
        let doc = "\
| Component | Description |
|-----------|-------------|
| TLS | old |
| TLS | new |
";
        let components = extract_components(doc);
        assert_eq!(components.len(), 1);
        assert_eq!(components["TLS"].fields["description"], "new");
    }

    #[test]
    fn test_extract_text_preserves_links() {
        let text = extract_text(DOC);
        assert!(text.contains("Traffic between services"));
        assert!(text.contains("[RFC 5246](https://example.com/rfc5246)"));
    }

    #[test]
    fn test_chunk_text_packs_paragraphs() {
        let text = "one two three\n\nfour five\n\nsix seven eight nine";
        let chunks = chunk_text(text, 5);
        assert_eq!(
            chunks,
            vec!["one two three\n\nfour five", "six seven eight nine"]
        );
    }

    #[test]
    fn test_chunk_text_oversized_paragraph() {
        let text = "a b c d e f g h";
        let chunks = chunk_text(text, 3);
        assert_eq!(chunks, vec!["a b c d e f g h"]);
    }

    #[test]
    fn test_component_map_round_trips_through_json() {
        let components = extract_components(DOC);
        let json = serde_json::to_string(&components).unwrap();
        let back: ComponentMap = serde_json::from_str(&json).unwrap();
        assert_eq!(components, back);
    }

    #[test]
    fn test_crawler_findings_serialize_as_info_found_in_link() {
        let component = Component {
            link_info: vec![LinkInfo {
                url: "https://example.com".to_string(),
                text: Some("Example page".to_string()),
                error: None,
            }],
            ..Component::default()
        };
        let json = serde_json::to_value(&component).unwrap();
        assert!(json.get("info_found_in_link").is_some());
        assert!(json.get("link_info").is_none());
    }
}
