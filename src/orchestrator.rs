//! Analysis orchestration
//!
//! Three ways to run the same pipeline: `direct` calls each stage in a fixed
//! order, `agent` lets the model drive the tools through function calling,
//! and `planner` asks the model for a step plan up front and then executes
//! it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::assess;
use crate::config::Config;
use crate::crawler::LinkExplorer;
use crate::graph::KnowledgeGraph;
use crate::ingest;
use crate::llm::extractor;
use crate::llm::mapper;
use crate::llm::types::ChatMessage;
use crate::llm::LlmClient;
use crate::prompts;
use crate::report;
use crate::tools::{ToolContext, ToolRegistry};

/// Upper bound on agent-mode tool rounds.
const MAX_AGENT_ITERATIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Fixed pipeline, no model-driven control flow
    Direct,
    /// Function-calling loop driven by the model
    Agent,
    /// Model produces a step plan which is then executed
    Planner,
}

/// What an analysis run produced, including partial results on failure paths.
#[derive(Debug, Default)]
pub struct AnalysisOutcome {
    pub report_path: Option<PathBuf>,
    pub mapping: BTreeMap<String, String>,
    pub unmapped: Vec<String>,
    /// Final model message in agent mode, step log in planner mode
    pub narrative: Option<String>,
    /// Verdict of the validation step, when it ran
    pub validation: Option<String>,
    /// Set when a pipeline step failed; the other fields hold whatever
    /// completed before it
    pub error: Option<String>,
}

impl AnalysisOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

pub struct Orchestrator {
    graph: Arc<KnowledgeGraph>,
    client: Arc<LlmClient>,
    registry: ToolRegistry,
    report_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(config: &Config, graph: KnowledgeGraph, report_dir: PathBuf) -> Result<Self> {
        let client = LlmClient::from_config(config)?;
        Ok(Self {
            graph: Arc::new(graph),
            client: Arc::new(client),
            registry: ToolRegistry::new(),
            report_dir,
        })
    }

    pub async fn run(&self, mode: Mode, document: &Path) -> Result<AnalysisOutcome> {
        info!("analyzing {} in {:?} mode", document.display(), mode);
        match mode {
            Mode::Direct => self.run_direct(document).await,
            Mode::Agent => self.run_agent(document).await,
            Mode::Planner => self.run_planner(document).await,
        }
    }

    /// The fixed pipeline: ingest, crawl, extract, map, assess, report,
    /// validate. A step failure stops the run but keeps what completed.
    async fn run_direct(&self, document: &Path) -> Result<AnalysisOutcome> {
        let mut outcome = AnalysisOutcome::default();
        if let Err(err) = self.direct_steps(document, &mut outcome).await {
            warn!("direct pipeline failed: {err:#}");
            outcome.error = Some(format!("{err:#}"));
        }
        Ok(outcome)
    }

    async fn direct_steps(&self, document: &Path, outcome: &mut AnalysisOutcome) -> Result<()> {
        let text = std::fs::read_to_string(document)
            .with_context(|| format!("reading {}", document.display()))?;

        let mut components = ingest::extract_components(&text);
        info!("extracted {} components", components.len());
        let doc_text = ingest::extract_text(&text);

        let explorer = LinkExplorer::new()?;
        explorer.explore(&mut components).await;

        let properties = extractor::extract_security_properties(&self.client, &doc_text).await?;
        if properties.is_empty() {
            warn!("no security properties were extracted from the document");
        }

        let additional_context = serde_json::json!({
            "security_properties": properties,
            "link_context": components
                .iter()
                .map(|(name, component)| (name.clone(), component.link_info.clone()))
                .collect::<BTreeMap<_, _>>(),
        });

        let entities = self.graph.entity_names();
        outcome.mapping =
            mapper::map_components(&self.client, &components, &entities, &additional_context)
                .await?;
        outcome.unmapped = components
            .keys()
            .filter(|name| !outcome.mapping.contains_key(*name))
            .cloned()
            .collect();
        if !outcome.unmapped.is_empty() {
            warn!("{} components could not be mapped", outcome.unmapped.len());
        }

        self.finish_direct(document, outcome)
    }

    /// Assess, render and write the report, then validate the results.
    fn finish_direct(&self, document: &Path, outcome: &mut AnalysisOutcome) -> Result<()> {
        let results = assess::assess(&outcome.mapping, &self.graph);
        let content = report::render_report(&results, &self.graph, &outcome.unmapped);
        let path = report::default_report_path(&self.report_dir, document);
        outcome.report_path = Some(report::write_report(&content, &path)?);

        let verdict = crate::tools::verdict_for(&serde_json::to_value(&results)?);
        if verdict != "VALID" {
            warn!("result validation failed: {verdict}");
        }
        outcome.validation = Some(verdict.to_string());
        Ok(())
    }

    /// Function-calling loop: the model decides which tools to call.
    async fn run_agent(&self, document: &Path) -> Result<AnalysisOutcome> {
        let ctx = self.tool_context();
        let definitions = self.registry.definitions();

        let mut messages = vec![
            ChatMessage::system(prompts::AGENT_INSTRUCTIONS),
            ChatMessage::user(prompts::agent_goal(&document.display().to_string())),
        ];
        let mut outcome = AnalysisOutcome::default();

        for iteration in 0..MAX_AGENT_ITERATIONS {
            let response = self
                .client
                .chat_with_tools(&messages, &definitions)
                .await
                .with_context(|| format!("agent iteration {iteration}"))?;

            if !response.wants_tools() {
                outcome.narrative = response.content.clone();
                return Ok(outcome);
            }

            let tool_calls = response.tool_calls().to_vec();
            messages.push(ChatMessage::assistant(response));

            for call in tool_calls {
                let name = call.function.name.clone();
                let args = call.function.parsed_arguments();
                debug!("agent calls {name}");

                let result = match self.registry.get(&name) {
                    Some(tool) => tool.execute(&ctx, args.clone()).await,
                    None => crate::tools::ToolResult::error(format!("unknown tool: {name}")),
                };
                self.record_tool_outcome(&name, &args, &result, &mut outcome);
                messages.push(ChatMessage::tool_result(call.id.clone(), result.content));
            }
        }

        warn!("agent did not finish within {MAX_AGENT_ITERATIONS} iterations");
        Ok(outcome)
    }

    /// Plan first, then execute: the model emits a JSON list of tool steps.
    async fn run_planner(&self, document: &Path) -> Result<AnalysisOutcome> {
        let prompt = prompts::planner_prompt(
            &document.display().to_string(),
            &self.registry.listing(),
        );
        let response = self.client.chat(&prompt, None, Some(true)).await?;
        let plan = parse_plan(&response).context("parsing the generated plan")?;
        info!("executing a plan of {} steps", plan.steps.len());

        let ctx = self.tool_context();
        let mut outcome = AnalysisOutcome::default();
        let mut step_outputs: Vec<String> = Vec::new();
        let mut log = Vec::new();

        for (index, step) in plan.steps.iter().enumerate() {
            let tool = self
                .registry
                .get(&step.tool)
                .with_context(|| format!("plan step {} names unknown tool {}", index + 1, step.tool))?;
            let args = substitute_step_refs(step.params.clone(), &step_outputs);

            let result = tool.execute(&ctx, args.clone()).await;
            if result.is_error {
                anyhow::bail!(
                    "plan step {} ({}) failed: {}",
                    index + 1,
                    step.tool,
                    result.content
                );
            }
            self.record_tool_outcome(&step.tool, &args, &result, &mut outcome);
            log.push(format!("step {}: {}", index + 1, step.tool));
            step_outputs.push(result.content);
        }

        outcome.narrative = Some(log.join("\n"));
        Ok(outcome)
    }

    /// Orchestrator over the seeded graph with an offline client.
    #[cfg(test)]
    fn offline_for_tests(report_dir: PathBuf) -> Self {
        Self {
            graph: Arc::new(crate::graph::test_fixtures::seeded_graph()),
            client: Arc::new(LlmClient::offline_for_tests()),
            registry: ToolRegistry::new(),
            report_dir,
        }
    }

    fn tool_context(&self) -> ToolContext {
        ToolContext {
            graph: Arc::clone(&self.graph),
            client: Arc::clone(&self.client),
            report_dir: self.report_dir.clone(),
        }
    }

    /// Fold a tool result into the outcome so partial progress survives a
    /// failed or truncated run.
    fn record_tool_outcome(
        &self,
        tool: &str,
        _args: &Value,
        result: &crate::tools::ToolResult,
        outcome: &mut AnalysisOutcome,
    ) {
        if result.is_error {
            return;
        }
        match tool {
            "map_to_knowledge_graph" => {
                if let Ok(mapping) = serde_json::from_str(&result.content) {
                    outcome.mapping = mapping;
                }
            }
            "generate_risk_report" => {
                outcome.report_path = Some(PathBuf::from(result.content.trim()));
            }
            "validate_results" => {
                outcome.validation = Some(result.content.clone());
            }
            _ => {}
        }
    }
}

#[derive(Debug, Deserialize)]
struct Plan {
    steps: Vec<PlanStep>,
}

#[derive(Debug, Deserialize)]
struct PlanStep {
    tool: String,
    #[serde(default)]
    params: Value,
}

fn parse_plan(response: &str) -> Result<Plan> {
    let raw = crate::llm::client::extract_json_object(response).unwrap_or(response);
    Ok(serde_json::from_str(raw)?)
}

/// Replace `$stepN` references in a step's params with earlier step outputs.
fn substitute_step_refs(params: Value, outputs: &[String]) -> Value {
    match params {
        Value::String(s) => {
            let mut replaced = s;
            for (index, output) in outputs.iter().enumerate() {
                let marker = format!("$step{}", index + 1);
                if replaced == marker {
                    return Value::String(output.clone());
                }
                if replaced.contains(&marker) {
                    replaced = replaced.replace(&marker, output);
                }
            }
            Value::String(replaced)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute_step_refs(item, outputs))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, substitute_step_refs(value, outputs)))
                .collect(),
        ),
        other => other,
    }
}
