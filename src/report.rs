//! Markdown risk report rendering
//!
//! Produces the final deliverable: a Markdown report with a summary of risk
//! levels and a per-component table carrying vulnerabilities, LIR scores and
//! STRIDE narratives pulled from the knowledge graph.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::assess::{ComponentAssessment, RiskLevel};
use crate::graph::KnowledgeGraph;

/// Default directory for generated reports, relative to the working directory.
pub const DEFAULT_REPORT_DIR: &str = "risk_reports";

/// Render the full Markdown report.
///
/// `unmapped` lists components that could not be matched to any knowledge
/// graph entity; they get their own section so they are not silently lost.
pub fn render_report(
    results: &BTreeMap<String, ComponentAssessment>,
    graph: &KnowledgeGraph,
    unmapped: &[String],
) -> String {
    let mut out = String::new();
    out.push_str("# Risk Assessment Report\n\n");
    let _ = writeln!(
        out,
        "Generated: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    out.push_str(
        "This report summarizes vulnerabilities and risk assessments for identified components.\n\n",
    );

    let count = |level: RiskLevel| {
        results
            .values()
            .filter(|a| a.risk_level == level)
            .count()
    };
    out.push_str("## Summary\n\n");
    let _ = writeln!(out, "- High Risk: {} components", count(RiskLevel::High));
    let _ = writeln!(out, "- Medium Risk: {} components", count(RiskLevel::Medium));
    let _ = writeln!(out, "- Low Risk: {} components\n", count(RiskLevel::Low));

    out.push_str("## Component Details\n\n");
    out.push_str("| Component (Entity) | Vulnerabilities | L | I | R | Risk Assessments |\n");
    out.push_str("|---------------------|-----------------|---|---|---|------------------|\n");

    for assessment in results.values() {
        let vuln_column = if assessment.vulnerabilities.is_empty() {
            "—".to_string()
        } else {
            assessment
                .vulnerabilities
                .iter()
                .map(|v| format_vuln_type(&v.vuln_type))
                .collect::<Vec<_>>()
                .join("<br><br>")
        };

        let mut lir = ("—".to_string(), "—".to_string(), "—".to_string());
        let mut risk_lines = Vec::new();
        for record in &assessment.assessments {
            if let Some(scores) = graph.lir_scores(record.assessment_id) {
                lir = (
                    scores.likelihood.to_string(),
                    scores.impact.to_string(),
                    scores.overall_risk.to_string(),
                );
            }
            if let Some(stride) = &record.quant_stride {
                risk_lines.push(format_stride(stride));
            }
        }
        let risk_column = if risk_lines.is_empty() {
            "—".to_string()
        } else {
            risk_lines.join("<br><br>")
        };

        let _ = writeln!(
            out,
            "| {} ({}) | {} | {} | {} | {} | {} |",
            assessment.component,
            assessment.entity,
            vuln_column,
            lir.0,
            lir.1,
            lir.2,
            risk_column
        );
    }

    if !unmapped.is_empty() {
        out.push_str("\n## Unmapped Components\n\n");
        out.push_str("The following components could not be matched to a known entity:\n\n");
        for component in unmapped {
            let _ = writeln!(out, "- {component}");
        }
    }

    out
}

/// Format a vulnerability description for the table.
///
/// Some database rows store the whole description as a JSON object, often
/// typed with curly quotes. Those are unpacked into `**kind:** description`
/// lines; anything else passes through unchanged.
fn format_vuln_type(raw: &str) -> String {
    if !raw.trim_start().starts_with('{') {
        return raw.to_string();
    }
    let normalized = normalize_quotes(raw);
    match serde_json::from_str::<serde_json::Value>(&normalized) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(kind, desc)| format!("**{kind}:** {}", value_as_text(desc)))
            .collect::<Vec<_>>()
            .join("<br>"),
        _ => raw.to_string(),
    }
}

/// Format a STRIDE narrative (JSON object of category to text).
fn format_stride(stride_json: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(stride_json) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(category, text)| format!("**{category}**: {}", value_as_text(text)))
            .collect::<Vec<_>>()
            .join("<br>"),
        _ => stride_json.to_string(),
    }
}

fn value_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_quotes(raw: &str) -> String {
    raw.replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Write a rendered report, creating parent directories as needed.
pub fn write_report(content: &str, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    fs::write(path, content)
        .with_context(|| format!("writing report to {}", path.display()))?;
    info!("risk report saved to {}", path.display());
    Ok(path.to_path_buf())
}

/// Default report path for a given input document.
pub fn default_report_path(report_dir: &Path, document: &Path) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    report_dir.join(format!("risk_report_{stem}.md"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assess::assess;
    use crate::graph::test_fixtures::seeded_graph;

    #[test]
    fn test_report_renders_summary_and_table() {
        let graph = seeded_graph();
        let mapping = BTreeMap::from([
            ("Transport".to_string(), "TLS 1.2".to_string()),
            ("KEM".to_string(), "Kyber-768".to_string()),
        ]);
        let results = assess(&mapping, &graph);

        let report = render_report(&results, &graph, &[]);

        assert!(report.contains("# Risk Assessment Report"));
        assert!(report.contains("- High Risk: 1 components"));
        assert!(report.contains("- Low Risk: 1 components"));
        assert!(report.contains("| Transport (TLS 1.2) |"));
        // LIR scores from the first assessment
        assert!(report.contains("| 4 | 5 | 5 |"));
        // STRIDE narrative unpacked from the quant_stride JSON
        assert!(report.contains("**Information Disclosure**: Recorded sessions become readable"));
        assert!(report.contains("| KEM (Kyber-768) | — | — | — | — | — |"));
    }

    #[test]
    fn test_unmapped_components_get_their_own_section() {
        let graph = seeded_graph();
        let report = render_report(&BTreeMap::new(), &graph, &["Mystery Box".to_string()]);
        assert!(report.contains("## Unmapped Components"));
        assert!(report.contains("- Mystery Box"));
    }

    #[test]
    fn test_curly_quoted_json_vuln_is_unpacked() {
        let raw = "{\u{201c}Shor\u{201d}: \u{201c}Breaks RSA key exchange\u{201d}}";
        assert_eq!(format_vuln_type(raw), "**Shor:** Breaks RSA key exchange");
    }

    #[test]
    fn test_plain_vuln_type_passes_through() {
        assert_eq!(
            format_vuln_type("Harvest now, decrypt later"),
            "Harvest now, decrypt later"
        );
    }

    #[test]
    fn test_write_report_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_report_path(&dir.path().join("reports"), Path::new("docs/design.md"));
        assert!(path.ends_with("risk_report_design.md"));

        let written = write_report("# Report", &path).unwrap();
        assert_eq!(fs::read_to_string(written).unwrap(), "# Report");
    }
}
