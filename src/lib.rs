//! QuantGPT - post-quantum cryptographic risk assessment
//!
//! This crate can be used as a library to run the analysis pipeline against
//! a design document and a knowledge graph of quantum-vulnerable entities.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use quantgpt::config::Config;
//! use quantgpt::graph::KnowledgeGraph;
//! use quantgpt::orchestrator::{Mode, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("."), None)?;
//!     let graph = KnowledgeGraph::load(Path::new("data/pq_risk.db"))?;
//!     let orchestrator = Orchestrator::new(&config, graph, "risk_reports".into())?;
//!
//!     let outcome = orchestrator.run(Mode::Direct, Path::new("design.md")).await?;
//!     if let Some(path) = outcome.report_path {
//!         println!("report at {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod assess;
pub mod config;
pub mod crawler;
pub mod graph;
pub mod ingest;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod security_properties;
pub mod tools;

pub use assess::{ComponentAssessment, RiskLevel};
pub use config::Config;
pub use graph::KnowledgeGraph;
pub use orchestrator::{AnalysisOutcome, Mode, Orchestrator};
pub use security_properties::SecurityProperties;
