//! Typed model for LLM-extracted security properties

use serde::{Deserialize, Serialize};

/// An extracted item together with the surrounding context it was found in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemWithContext {
    pub name: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// A pointer to further reading found in the document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub topic: String,
    pub reference: String,
}

/// Security-relevant properties extracted from unstructured document text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityProperties {
    pub encryption_algorithms: Vec<ItemWithContext>,
    pub protocols: Vec<ItemWithContext>,
    pub certificates: Vec<ItemWithContext>,
    pub key_lifetimes: Vec<ItemWithContext>,
    pub key_distribution: Vec<ItemWithContext>,
    pub authorization: Vec<ItemWithContext>,
    pub further_references: Vec<Reference>,
}

impl SecurityProperties {
    /// Combine per-chunk extractions into one model, deduping identical
    /// (name, context) pairs per category and identical references. First
    /// occurrence wins; order is preserved.
    pub fn merge(outputs: impl IntoIterator<Item = SecurityProperties>) -> SecurityProperties {
        use std::collections::HashSet;

        let mut combined = SecurityProperties::default();
        let mut seen_items: [HashSet<ItemWithContext>; 6] = Default::default();
        let mut seen_refs: HashSet<Reference> = HashSet::new();

        for output in outputs {
            let categories = [
                (&output.encryption_algorithms, 0usize),
                (&output.protocols, 1),
                (&output.certificates, 2),
                (&output.key_lifetimes, 3),
                (&output.key_distribution, 4),
                (&output.authorization, 5),
            ];
            for (items, slot) in categories {
                for item in items {
                    if seen_items[slot].insert(item.clone()) {
                        combined.category_mut(slot).push(item.clone());
                    }
                }
            }
            for reference in &output.further_references {
                if seen_refs.insert(reference.clone()) {
                    combined.further_references.push(reference.clone());
                }
            }
        }

        combined
    }

    fn category_mut(&mut self, slot: usize) -> &mut Vec<ItemWithContext> {
        match slot {
            0 => &mut self.encryption_algorithms,
            1 => &mut self.protocols,
            2 => &mut self.certificates,
            3 => &mut self.key_lifetimes,
            4 => &mut self.key_distribution,
            _ => &mut self.authorization,
        }
    }

    /// True when no category holds any item
    pub fn is_empty(&self) -> bool {
        self.encryption_algorithms.is_empty()
            && self.protocols.is_empty()
            && self.certificates.is_empty()
            && self.key_lifetimes.is_empty()
            && self.key_distribution.is_empty()
            && self.authorization.is_empty()
            && self.further_references.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(name: &str, context: Option<&str>) -> ItemWithContext {
        ItemWithContext {
            name: name.to_string(),
            context: context.map(str::to_string),
        }
    }

    #[test]
    fn test_merge_dedupes_identical_pairs() {
        let a = SecurityProperties {
            encryption_algorithms: vec![item("AES-256", Some("at rest")), item("RSA-2048", None)],
            ..Default::default()
        };
        let b = SecurityProperties {
            encryption_algorithms: vec![
                item("AES-256", Some("at rest")),   // exact duplicate
                item("AES-256", Some("in transit")), // same name, new context
            ],
            ..Default::default()
        };

        let merged = SecurityProperties::merge([a, b]);
        assert_eq!(
            merged.encryption_algorithms,
            vec![
                item("AES-256", Some("at rest")),
                item("RSA-2048", None),
                item("AES-256", Some("in transit")),
            ]
        );
    }

    #[test]
    fn test_merge_dedupes_references() {
        let reference = Reference {
            topic: "PQC migration".to_string(),
            reference: "https://example.com/pqc".to_string(),
        };
        let a = SecurityProperties {
            further_references: vec![reference.clone()],
            ..Default::default()
        };
        let b = SecurityProperties {
            further_references: vec![reference.clone()],
            ..Default::default()
        };

        let merged = SecurityProperties::merge([a, b]);
        assert_eq!(merged.further_references, vec![reference]);
    }

    #[test]
    fn test_deserialize_partial_json() {
        // Missing categories default to empty rather than failing validation
        let props: SecurityProperties =
            serde_json::from_str(r#"{"protocols": [{"name": "TLS 1.3"}]}"#).unwrap();
        assert_eq!(props.protocols, vec![item("TLS 1.3", None)]);
        assert!(props.encryption_algorithms.is_empty());
        assert!(!props.is_empty());
    }

    #[test]
    fn test_is_empty() {
        assert!(SecurityProperties::default().is_empty());
    }
}
