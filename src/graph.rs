//! Post-quantum risk knowledge graph
//!
//! The graph is loaded from the `pq_risk.db` SQLite database and held in
//! memory as a petgraph `DiGraph`. Entities are the master nodes;
//! algorithms, protocols and certificates link to their entity, and risk
//! assessments hang off entities with vulnerability and LIR score edges.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from loading or querying the knowledge graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{table} row references unknown entity_id {entity_id}")]
    DanglingEntity { table: &'static str, entity_id: i64 },
}

/// A named entity: the master record everything else attaches to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: i64,
    pub entity_type: String,
    pub entity_name: String,
}

/// A cryptographic algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Algorithm {
    pub algorithm_id: i64,
    pub algo_name: String,
    pub algo_family: String,
    pub crypto_type: String,
}

/// A network/security protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub protocol_id: i64,
    pub protocol_name: String,
    pub cipher_suites: String,
}

/// A certificate profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub cert_id: i64,
    pub cert_name: String,
    pub recommended_crypto_suite: String,
}

/// A known vulnerability class (e.g. "Shor's algorithm breaks RSA")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub vuln_id: i64,
    pub vuln_type: String,
}

/// Likelihood / Impact / overall Risk scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LirScores {
    pub lir_id: i64,
    pub likelihood: i64,
    pub impact: i64,
    pub overall_risk: i64,
}

/// A risk assessment with its STRIDE narrative (JSON text)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub assessment_id: i64,
    pub quant_stride: Option<String>,
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Entity(Entity),
    Algorithm(Algorithm),
    Protocol(Protocol),
    Certificate(Certificate),
    Vulnerability(Vulnerability),
    Lir(LirScores),
    RiskAssessment(RiskAssessment),
}

impl Node {
    /// Human-readable label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            Node::Entity(_) => "Entity",
            Node::Algorithm(_) => "Algorithm",
            Node::Protocol(_) => "Protocol",
            Node::Certificate(_) => "Certificate",
            Node::Vulnerability(_) => "Vulnerability",
            Node::Lir(_) => "LIR",
            Node::RiskAssessment(_) => "RiskAssessment",
        }
    }
}

/// Edge payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// algorithm/protocol/certificate -> its entity record
    IsEntity,
    /// algorithm -> protocol that deploys it
    UsedIn,
    /// entity -> risk assessment
    HasAssessment,
    /// risk assessment -> vulnerability
    HasVulnerability,
    /// risk assessment -> LIR scores
    HasRisk,
}

impl Relation {
    pub fn name(&self) -> &'static str {
        match self {
            Relation::IsEntity => "IS_ENTITY",
            Relation::UsedIn => "USED_IN",
            Relation::HasAssessment => "HAS_ASSESSMENT",
            Relation::HasVulnerability => "HAS_VULNERABILITY",
            Relation::HasRisk => "HAS_RISK",
        }
    }
}

/// In-memory knowledge graph
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<Node, Relation>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the graph from a SQLite database file
    pub fn load(db_path: &Path) -> Result<Self, GraphError> {
        let conn = Connection::open(db_path)?;
        Self::load_from_connection(&conn)
    }

    /// Build the graph from an open connection (tests use `:memory:`)
    pub fn load_from_connection(conn: &Connection) -> Result<Self, GraphError> {
        let mut g = Self::new();

        let mut entity_nodes: BTreeMap<i64, NodeIndex> = BTreeMap::new();
        let mut stmt =
            conn.prepare("SELECT entity_id, entity_type, entity_name FROM entities")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let entity = Entity {
                entity_id: row.get(0)?,
                entity_type: row.get(1)?,
                entity_name: row.get(2)?,
            };
            entity_nodes.insert(entity.entity_id, g.add_node(Node::Entity(entity)));
        }

        let resolve = |map: &BTreeMap<i64, NodeIndex>, id: i64, table: &'static str| {
            map.get(&id)
                .copied()
                .ok_or(GraphError::DanglingEntity { table, entity_id: id })
        };

        let mut stmt = conn.prepare(
            "SELECT algorithm_id, entity_id, algo_name, algo_family, crypto_type FROM algorithms",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let entity_id: i64 = row.get(1)?;
            let algo = Algorithm {
                algorithm_id: row.get(0)?,
                algo_name: row.get(2)?,
                algo_family: row.get(3)?,
                crypto_type: row.get(4)?,
            };
            let node = g.add_node(Node::Algorithm(algo));
            let entity = resolve(&entity_nodes, entity_id, "algorithms")?;
            g.add_relation(node, Relation::IsEntity, entity);
        }

        let mut stmt = conn.prepare(
            "SELECT protocol_id, entity_id, protocol_name, cipher_suites FROM protocols",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let entity_id: i64 = row.get(1)?;
            let proto = Protocol {
                protocol_id: row.get(0)?,
                protocol_name: row.get(2)?,
                cipher_suites: row.get(3)?,
            };
            let node = g.add_node(Node::Protocol(proto));
            let entity = resolve(&entity_nodes, entity_id, "protocols")?;
            g.add_relation(node, Relation::IsEntity, entity);
        }

        let mut stmt = conn.prepare(
            "SELECT cert_id, entity_id, cert_name, recommended_crypto_suite FROM certificates",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let entity_id: i64 = row.get(1)?;
            let cert = Certificate {
                cert_id: row.get(0)?,
                cert_name: row.get(2)?,
                recommended_crypto_suite: row.get(3)?,
            };
            let node = g.add_node(Node::Certificate(cert));
            let entity = resolve(&entity_nodes, entity_id, "certificates")?;
            g.add_relation(node, Relation::IsEntity, entity);
        }

        let mut vuln_nodes: BTreeMap<i64, NodeIndex> = BTreeMap::new();
        let mut stmt = conn.prepare("SELECT vuln_id, vuln_type FROM vulnerabilities")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let vuln = Vulnerability {
                vuln_id: row.get(0)?,
                vuln_type: row.get(1)?,
            };
            vuln_nodes.insert(vuln.vuln_id, g.add_node(Node::Vulnerability(vuln)));
        }

        let mut lir_nodes: BTreeMap<i64, NodeIndex> = BTreeMap::new();
        let mut stmt =
            conn.prepare("SELECT lir_id, likelihood, impact, overall_risk FROM lir")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let lir = LirScores {
                lir_id: row.get(0)?,
                likelihood: row.get(1)?,
                impact: row.get(2)?,
                overall_risk: row.get(3)?,
            };
            lir_nodes.insert(lir.lir_id, g.add_node(Node::Lir(lir)));
        }

        let mut stmt = conn.prepare(
            "SELECT assessment_id, entity_id, vuln_id, lir_id, quant_stride FROM risk_assessments",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let entity_id: i64 = row.get(1)?;
            let vuln_id: Option<i64> = row.get(2)?;
            let lir_id: Option<i64> = row.get(3)?;
            let assessment = RiskAssessment {
                assessment_id: row.get(0)?,
                quant_stride: row.get(4)?,
            };
            let node = g.add_node(Node::RiskAssessment(assessment));
            let entity = resolve(&entity_nodes, entity_id, "risk_assessments")?;
            g.add_relation(entity, Relation::HasAssessment, node);
            // Assessments may reference vulnerabilities or scores that were
            // never imported; those edges are simply absent.
            if let Some(vuln) = vuln_id.and_then(|id| vuln_nodes.get(&id)) {
                g.add_relation(node, Relation::HasVulnerability, *vuln);
            }
            if let Some(lir) = lir_id.and_then(|id| lir_nodes.get(&id)) {
                g.add_relation(node, Relation::HasRisk, *lir);
            }
        }

        debug!(
            nodes = g.graph.node_count(),
            edges = g.graph.edge_count(),
            "knowledge graph loaded"
        );

        Ok(g)
    }

    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        self.graph.add_node(node)
    }

    pub fn add_relation(&mut self, src: NodeIndex, relation: Relation, dst: NodeIndex) {
        self.graph.add_edge(src, dst, relation);
    }

    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(index)
    }

    /// All entity names, in insertion order; the candidate list for mapping
    pub fn entity_names(&self) -> Vec<String> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Entity(e) => Some(e.entity_name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Entity nodes matching a name (names are not required to be unique)
    fn entities_named(&self, name: &str) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&i| {
                matches!(&self.graph[i], Node::Entity(e) if e.entity_name == name)
            })
            .collect()
    }

    /// Assessment nodes attached to a named entity
    fn assessments_of(&self, entity: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .edges_directed(entity, Direction::Outgoing)
            .filter(|e| *e.weight() == Relation::HasAssessment)
            .map(|e| e.target())
    }

    /// Vulnerabilities reachable from a named entity through its assessments
    pub fn vulnerabilities(&self, entity_name: &str) -> Vec<&Vulnerability> {
        let mut vulns = Vec::new();
        for entity in self.entities_named(entity_name) {
            for assessment in self.assessments_of(entity) {
                for edge in self.graph.edges_directed(assessment, Direction::Outgoing) {
                    if *edge.weight() == Relation::HasVulnerability {
                        if let Node::Vulnerability(v) = &self.graph[edge.target()] {
                            vulns.push(v);
                        }
                    }
                }
            }
        }
        vulns
    }

    /// Risk assessments attached to a named entity
    pub fn risk_assessments(&self, entity_name: &str) -> Vec<&RiskAssessment> {
        let mut assessments = Vec::new();
        for entity in self.entities_named(entity_name) {
            for assessment in self.assessments_of(entity) {
                if let Node::RiskAssessment(ra) = &self.graph[assessment] {
                    assessments.push(ra);
                }
            }
        }
        assessments
    }

    /// LIR scores for an assessment id, through its HasRisk edge
    pub fn lir_scores(&self, assessment_id: i64) -> Option<LirScores> {
        let node = self.graph.node_indices().find(|&i| {
            matches!(&self.graph[i], Node::RiskAssessment(ra) if ra.assessment_id == assessment_id)
        })?;
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .find(|e| *e.weight() == Relation::HasRisk)
            .and_then(|e| match &self.graph[e.target()] {
                Node::Lir(lir) => Some(*lir),
                _ => None,
            })
    }

    /// Protocols linked from a named algorithm by a UsedIn edge
    pub fn protocols_using_algorithm(&self, algo_name: &str) -> Vec<&Protocol> {
        let mut protocols = Vec::new();
        for index in self.graph.node_indices() {
            let matches = matches!(&self.graph[index], Node::Algorithm(a) if a.algo_name == algo_name);
            if !matches {
                continue;
            }
            for edge in self.graph.edges_directed(index, Direction::Outgoing) {
                if *edge.weight() == Relation::UsedIn {
                    if let Node::Protocol(p) = &self.graph[edge.target()] {
                        protocols.push(p);
                    }
                }
            }
        }
        protocols
    }

    /// Node counts by label and edge counts by relation
    pub fn summary(&self) -> GraphSummary {
        let mut nodes_by_label: BTreeMap<&'static str, usize> = BTreeMap::new();
        for node in self.graph.node_weights() {
            *nodes_by_label.entry(node.label()).or_default() += 1;
        }
        let mut edges_by_relation: BTreeMap<&'static str, usize> = BTreeMap::new();
        for edge in self.graph.edge_weights() {
            *edges_by_relation.entry(edge.name()).or_default() += 1;
        }
        GraphSummary {
            nodes_by_label,
            edges_by_relation,
        }
    }
}

use petgraph::visit::EdgeRef;

/// Counts reported by [`KnowledgeGraph::summary`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSummary {
    pub nodes_by_label: BTreeMap<&'static str, usize>,
    pub edges_by_relation: BTreeMap<&'static str, usize>,
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nodes by label:")?;
        for (label, count) in &self.nodes_by_label {
            writeln!(f, "  {}: {}", label, count)?;
        }
        writeln!(f, "Relationships by type:")?;
        for (relation, count) in &self.edges_by_relation {
            writeln!(f, "  {}: {}", relation, count)?;
        }
        Ok(())
    }
}

/// Create the pq_risk tables on a fresh database
pub fn init_schema(conn: &Connection) -> Result<(), GraphError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entities (
            entity_id INTEGER PRIMARY KEY,
            entity_type TEXT,
            entity_name TEXT
        );
        CREATE TABLE IF NOT EXISTS algorithms (
            algorithm_id INTEGER PRIMARY KEY,
            entity_id INTEGER,
            algo_name TEXT,
            algo_family TEXT,
            crypto_type TEXT,
            FOREIGN KEY (entity_id) REFERENCES entities (entity_id)
        );
        CREATE TABLE IF NOT EXISTS certificates (
            cert_id INTEGER PRIMARY KEY,
            entity_id INTEGER,
            cert_name TEXT,
            recommended_crypto_suite TEXT,
            FOREIGN KEY (entity_id) REFERENCES entities (entity_id)
        );
        CREATE TABLE IF NOT EXISTS protocols (
            protocol_id INTEGER PRIMARY KEY,
            entity_id INTEGER,
            protocol_name TEXT,
            cipher_suites TEXT,
            FOREIGN KEY (entity_id) REFERENCES entities (entity_id)
        );
        CREATE TABLE IF NOT EXISTS lir (
            lir_id INTEGER PRIMARY KEY,
            likelihood INTEGER,
            impact INTEGER,
            overall_risk INTEGER
        );
        CREATE TABLE IF NOT EXISTS vulnerabilities (
            vuln_id INTEGER PRIMARY KEY,
            vuln_type TEXT
        );
        CREATE TABLE IF NOT EXISTS risk_assessments (
            assessment_id INTEGER PRIMARY KEY,
            entity_id INTEGER,
            vuln_id INTEGER,
            lir_id INTEGER,
            quant_stride TEXT,
            FOREIGN KEY (entity_id) REFERENCES entities (entity_id),
            FOREIGN KEY (vuln_id) REFERENCES vulnerabilities (vuln_id),
            FOREIGN KEY (lir_id) REFERENCES lir (lir_id)
        );",
    )?;
    Ok(())
}
