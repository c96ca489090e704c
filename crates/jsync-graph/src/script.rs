//! Structured Gremlin statements and their rendering.
//!
//! Statements are plain data; [`ScriptBuilder::build`] renders them into a
//! Groovy script for the JanusGraph server. Caller-supplied names (graphs,
//! labels, keys, indexes) are always passed as bindings and referenced by
//! variable name, so they never become part of the script text. Enum-valued
//! settings come from closed Rust enums and are written inline.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::index::IndexStatus;
use crate::mapping::{Cardinality, DataType, Direction, Multiplicity, SortOrder};

/// Binding name that always carries the target graph name.
pub const GRAPH_NAME_BINDING: &str = "graphName";

/// A rendered script plus the bindings it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub text: String,
    pub bindings: Map<String, Value>,
}

impl Script {
    /// Value bound under `name`, if it is a string.
    pub fn binding_str(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).and_then(Value::as_str)
    }

    /// Binding names whose value equals `value`.
    pub fn bindings_for(&self, value: &str) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|(_, v)| v.as_str() == Some(value))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// How a graph index is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIndexBacking {
    Composite,
    /// Search-backed; holds the search index name.
    Mixed(String),
}

/// Enough information to look up an index's status.
///
/// Graph indexes report status per key, so the first key is carried along.
/// Relation indexes are addressed by name plus edge label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRef {
    Graph { name: String, first_key: String },
    Relation { name: String, edge_label: String },
}

impl IndexRef {
    pub fn name(&self) -> &str {
        match self {
            IndexRef::Graph { name, .. } | IndexRef::Relation { name, .. } => name,
        }
    }
}

/// One management instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateGraphConfiguration {
        graph: String,
        settings: Vec<(&'static str, Value)>,
    },
    InitializeGraph { graph: String },
    ListGraphNames,
    DropGraph { graph: String },
    OpenGraph { graph: String },
    CommitTransaction,
    OpenManagement,
    CommitManagement,
    RollbackManagement,
    EnsureVertexLabel { label: String },
    EnsureEdgeLabel { label: String, multiplicity: Multiplicity },
    EnsurePropertyKey { key: String, data_type: DataType, cardinality: Cardinality },
    BuildGraphIndex {
        name: String,
        keys: Vec<String>,
        vertex_label: String,
        unique: bool,
        backing: GraphIndexBacking,
    },
    BuildRelationIndex {
        name: String,
        edge_label: String,
        direction: Direction,
        order: SortOrder,
        keys: Vec<String>,
    },
    AwaitStatus {
        index: IndexRef,
        statuses: Vec<IndexStatus>,
        timeout: Duration,
    },
    /// Enable the index if it is REGISTERED and record its name in `enabled`.
    EnableIfRegistered { index: IndexRef },
    CollectStatuses { indexes: Vec<IndexRef> },
    ReturnStatuses,
    /// Names recorded by every preceding `EnableIfRegistered`.
    ReturnEnabled,
}

impl Statement {
    /// Name of the index this statement builds, if any.
    pub fn built_index(&self) -> Option<&str> {
        match self {
            Statement::BuildGraphIndex { name, .. } | Statement::BuildRelationIndex { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Whether the statement touches indexes at all.
    pub fn is_index_statement(&self) -> bool {
        matches!(
            self,
            Statement::BuildGraphIndex { .. }
                | Statement::BuildRelationIndex { .. }
                | Statement::AwaitStatus { .. }
                | Statement::EnableIfRegistered { .. }
                | Statement::CollectStatuses { .. }
        )
    }
}

/// Ordered list of statements waiting to be rendered.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    statements: Vec<Statement>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) -> &mut Self {
        self.statements.push(statement);
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Render every statement, in order, into one script.
    pub fn build(&self) -> Script {
        let mut renderer = Renderer::default();
        for statement in &self.statements {
            renderer.render(statement);
        }
        Script {
            text: renderer.text,
            bindings: renderer.bindings,
        }
    }
}

#[derive(Default)]
struct Renderer {
    text: String,
    bindings: Map<String, Value>,
    by_value: HashMap<(&'static str, String), String>,
    counters: HashMap<&'static str, usize>,
    enabled_declared: bool,
}

impl Renderer {
    /// Bind a string and return the variable that refers to it.
    ///
    /// The same value under the same hint reuses one variable.
    fn bind(&mut self, hint: &'static str, value: &str) -> String {
        if let Some(existing) = self.by_value.get(&(hint, value.to_string())) {
            return existing.clone();
        }
        let name = self.fresh(hint);
        self.bindings.insert(name.clone(), Value::String(value.to_string()));
        self.by_value.insert((hint, value.to_string()), name.clone());
        name
    }

    fn bind_value(&mut self, hint: &'static str, value: Value) -> String {
        let name = self.fresh(hint);
        self.bindings.insert(name.clone(), value);
        name
    }

    fn bind_graph(&mut self, graph: &str) -> &'static str {
        self.bindings
            .insert(GRAPH_NAME_BINDING.to_string(), Value::String(graph.to_string()));
        GRAPH_NAME_BINDING
    }

    fn fresh(&mut self, hint: &'static str) -> String {
        let counter = self.counters.entry(hint).or_insert(0);
        let name = format!("{}{}", hint, counter);
        *counter += 1;
        name
    }

    fn line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    fn render(&mut self, statement: &Statement) {
        match statement {
            Statement::CreateGraphConfiguration { graph, settings } => {
                self.line("map = new HashMap<String, Object>();");
                for (key, value) in settings {
                    let var = self.bind_value("setting", value.clone());
                    let line = format!("map.put('{}', {});", key, var);
                    self.line(&line);
                }
                let graph = self.bind_graph(graph);
                let line = format!("map.put('graph.graphname', {});", graph);
                self.line(&line);
                self.line("ConfiguredGraphFactory.createConfiguration(new MapConfiguration(map));");
            }
            Statement::InitializeGraph { graph } => {
                let graph = self.bind_graph(graph);
                let line = format!("ConfiguredGraphFactory.open({}).vertices().size();", graph);
                self.line(&line);
            }
            Statement::ListGraphNames => self.line("ConfiguredGraphFactory.getGraphNames();"),
            Statement::DropGraph { graph } => {
                let graph = self.bind_graph(graph);
                let line = format!("ConfiguredGraphFactory.drop({});", graph);
                self.line(&line);
            }
            Statement::OpenGraph { graph } => {
                let graph = self.bind_graph(graph);
                let line = format!("graph = ConfiguredGraphFactory.open({});", graph);
                self.line(&line);
            }
            Statement::CommitTransaction => self.line("graph.tx().commit();"),
            Statement::OpenManagement => self.line("mgmt = graph.openManagement();"),
            Statement::CommitManagement => self.line("mgmt.commit();"),
            Statement::RollbackManagement => self.line("mgmt.rollback();"),
            Statement::EnsureVertexLabel { label } => {
                let label = self.bind("vertexLabel", label);
                let line = format!(
                    "if (!mgmt.containsVertexLabel({l})) mgmt.makeVertexLabel({l}).make();",
                    l = label
                );
                self.line(&line);
            }
            Statement::EnsureEdgeLabel { label, multiplicity } => {
                let label = self.bind("edgeLabel", label);
                let line = format!(
                    "if (!mgmt.containsEdgeLabel({l})) mgmt.makeEdgeLabel({l}).multiplicity(Multiplicity.{m}).make();",
                    l = label,
                    m = multiplicity.as_str()
                );
                self.line(&line);
            }
            Statement::EnsurePropertyKey { key, data_type, cardinality } => {
                let key = self.bind("key", key);
                let line = format!(
                    "if (!mgmt.containsPropertyKey({k})) mgmt.makePropertyKey({k}).dataType({t}).cardinality(org.janusgraph.core.Cardinality.{c}).make();",
                    k = key,
                    t = data_type.class_name(),
                    c = cardinality.as_str()
                );
                self.line(&line);
            }
            Statement::BuildGraphIndex { name, keys, vertex_label, unique, backing } => {
                let name = self.bind("index", name);
                let mut line = format!(
                    "if (!mgmt.containsGraphIndex({n})) mgmt.buildIndex({n}, Vertex.class)",
                    n = name
                );
                for key in keys {
                    let key = self.bind("key", key);
                    let _ = write!(line, ".addKey(mgmt.getPropertyKey({}))", key);
                }
                let label = self.bind("vertexLabel", vertex_label);
                let _ = write!(line, ".indexOnly(mgmt.getVertexLabel({}))", label);
                if *unique {
                    line.push_str(".unique()");
                }
                match backing {
                    GraphIndexBacking::Composite => line.push_str(".buildCompositeIndex();"),
                    GraphIndexBacking::Mixed(search) => {
                        let search = self.bind("indexBackend", search);
                        let _ = write!(line, ".buildMixedIndex({});", search);
                    }
                }
                self.line(&line);
            }
            Statement::BuildRelationIndex { name, edge_label, direction, order, keys } => {
                let label = self.bind("edgeLabel", edge_label);
                let name = self.bind("index", name);
                let line = format!("relationLabel = mgmt.getEdgeLabel({});", label);
                self.line(&line);
                let mut line = format!(
                    "if (!mgmt.containsRelationIndex(relationLabel, {n})) mgmt.buildEdgeIndex(relationLabel, {n}, Direction.{d}, Order.{o}",
                    n = name,
                    d = direction.as_str(),
                    o = order.as_str()
                );
                for key in keys {
                    let key = self.bind("key", key);
                    let _ = write!(line, ", mgmt.getPropertyKey({})", key);
                }
                line.push_str(");");
                self.line(&line);
            }
            Statement::AwaitStatus { index, statuses, timeout } => {
                let watcher = self.status_watcher(index);
                let statuses = statuses
                    .iter()
                    .map(|s| format!("SchemaStatus.{}", s.as_str()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let name = self.bind("index", index.name());
                let line = format!(
                    "report = {w}.status({s}).timeout({t}, java.time.temporal.ChronoUnit.MILLIS).call();",
                    w = watcher,
                    s = statuses,
                    t = timeout.as_millis()
                );
                self.line(&line);
                let line = format!(
                    "if (!report.getSucceeded()) throw new IllegalStateException('Index status wait timed out: ' + {});",
                    name
                );
                self.line(&line);
            }
            Statement::EnableIfRegistered { index } => {
                self.declare_enabled();
                let lookup = self.index_lookup(index);
                let status = self.status_query(index);
                let name = self.bind("index", index.name());
                let line = format!(
                    "if ({s}.equals(SchemaStatus.REGISTERED)) {{ mgmt.updateIndex({l}, SchemaAction.ENABLE_INDEX); enabled << {n}; }}",
                    s = status,
                    l = lookup,
                    n = name
                );
                self.line(&line);
            }
            Statement::CollectStatuses { indexes } => {
                self.line("statuses = [];");
                for index in indexes {
                    let exists = self.index_exists(index);
                    let status = self.status_query(index);
                    let line = format!(
                        "statuses << ({e} ? {s}.toString() : '{a}');",
                        e = exists,
                        s = status,
                        a = IndexStatus::Absent.as_str()
                    );
                    self.line(&line);
                }
            }
            Statement::ReturnStatuses => self.line("statuses"),
            Statement::ReturnEnabled => {
                self.declare_enabled();
                self.line("enabled");
            }
        }
    }

    fn declare_enabled(&mut self) {
        if !self.enabled_declared {
            self.line("enabled = [];");
            self.enabled_declared = true;
        }
    }

    fn index_lookup(&mut self, index: &IndexRef) -> String {
        match index {
            IndexRef::Graph { name, .. } => {
                let name = self.bind("index", name);
                format!("mgmt.getGraphIndex({})", name)
            }
            IndexRef::Relation { name, edge_label } => {
                let label = self.bind("edgeLabel", edge_label);
                let name = self.bind("index", name);
                format!("mgmt.getRelationIndex(mgmt.getEdgeLabel({}), {})", label, name)
            }
        }
    }

    fn status_query(&mut self, index: &IndexRef) -> String {
        let lookup = self.index_lookup(index);
        match index {
            IndexRef::Graph { first_key, .. } => {
                let key = self.bind("key", first_key);
                format!("{}.getIndexStatus(mgmt.getPropertyKey({}))", lookup, key)
            }
            IndexRef::Relation { .. } => format!("{}.getIndexStatus()", lookup),
        }
    }

    fn index_exists(&mut self, index: &IndexRef) -> String {
        match index {
            IndexRef::Graph { name, .. } => {
                let name = self.bind("index", name);
                format!("mgmt.containsGraphIndex({})", name)
            }
            IndexRef::Relation { name, edge_label } => {
                let label = self.bind("edgeLabel", edge_label);
                let name = self.bind("index", name);
                format!(
                    "(mgmt.containsEdgeLabel({l}) && mgmt.containsRelationIndex(mgmt.getEdgeLabel({l}), {n}))",
                    l = label,
                    n = name
                )
            }
        }
    }

    fn status_watcher(&mut self, index: &IndexRef) -> String {
        match index {
            IndexRef::Graph { name, .. } => {
                let name = self.bind("index", name);
                format!("ManagementSystem.awaitGraphIndexStatus(graph, {})", name)
            }
            IndexRef::Relation { name, edge_label } => {
                let name = self.bind("index", name);
                let label = self.bind("edgeLabel", edge_label);
                format!("ManagementSystem.awaitRelationIndexStatus(graph, {}, {})", name, label)
            }
        }
    }
}
