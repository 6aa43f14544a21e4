//! Deterministic risk triage
//!
//! Once components are mapped to knowledge-graph entities, risk levels are
//! derived directly from the graph. Anything touched by Shor's algorithm is
//! High, any other recorded vulnerability is Medium, a mapped entity with a
//! clean record is Low.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{KnowledgeGraph, RiskAssessment, Vulnerability};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triage result for one mapped component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentAssessment {
    pub component: String,
    pub entity: String,
    pub risk_level: RiskLevel,
    pub vulnerabilities: Vec<Vulnerability>,
    pub assessments: Vec<RiskAssessment>,
}

/// Assess every mapped component against the knowledge graph.
///
/// The result is keyed by component name. Components absent from the
/// mapping are deliberately not assessed; the report calls them out as
/// unmapped instead.
pub fn assess(
    mapping: &BTreeMap<String, String>,
    graph: &KnowledgeGraph,
) -> BTreeMap<String, ComponentAssessment> {
    let mut results = BTreeMap::new();
    for (component, entity) in mapping {
        let vulnerabilities: Vec<Vulnerability> = graph
            .vulnerabilities(entity)
            .into_iter()
            .cloned()
            .collect();
        let assessments: Vec<RiskAssessment> = graph
            .risk_assessments(entity)
            .into_iter()
            .cloned()
            .collect();
        let risk_level = triage(&vulnerabilities);
        debug!("{component} -> {entity}: {risk_level}");
        results.insert(
            component.clone(),
            ComponentAssessment {
                component: component.clone(),
                entity: entity.clone(),
                risk_level,
                vulnerabilities,
                assessments,
            },
        );
    }
    results
}

fn triage(vulnerabilities: &[Vulnerability]) -> RiskLevel {
    if vulnerabilities
        .iter()
        .any(|v| v.vuln_type.to_lowercase().contains("shor"))
    {
        RiskLevel::High
    } else if !vulnerabilities.is_empty() {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
