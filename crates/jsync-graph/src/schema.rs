//! Graph lifecycle and mapping synchronization.
//!
//! Every operation is one script submission, except `ensure_graph` (check,
//! then create) and `sync_mapping` (mapping, then indexes). The first failing
//! submission ends the operation and its error is returned unchanged.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{string_list, ScriptClient};
use crate::config::{AwaitConfig, BackendConfig, JsyncConfig};
use crate::error::{SchemaError, SchemaResult};
use crate::index::SyncReport;
use crate::mapping::MappingDescriptor;
use crate::script::{ScriptBuilder, Statement};

/// Emits idempotent schema scripts to a Gremlin endpoint.
pub struct SchemaSynchronizer<C> {
    client: C,
    backend: BackendConfig,
    await_: AwaitConfig,
}

impl<C: ScriptClient> SchemaSynchronizer<C> {
    pub fn new(client: C, config: &JsyncConfig) -> Self {
        Self {
            client,
            backend: config.backend.clone(),
            await_: config.await_.clone(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub(crate) fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    pub(crate) fn await_config(&self) -> &AwaitConfig {
        &self.await_
    }

    pub(crate) async fn submit(&self, script: &ScriptBuilder) -> SchemaResult<Value> {
        let script = script.build();
        debug!(bytes = script.text.len(), "Executing schema script");
        self.client.execute(&script).await
    }

    /// Script that registers a graph configuration and opens the graph.
    pub fn create_graph_script(&self, name: &str) -> ScriptBuilder {
        let b = &self.backend;
        let mut script = ScriptBuilder::new();
        script
            .push(Statement::CreateGraphConfiguration {
                graph: name.to_string(),
                settings: vec![
                    ("storage.backend", Value::from(b.storage_backend.as_str())),
                    ("storage.hostname", Value::from(b.storage_hostname.as_str())),
                    ("storage.port", Value::from(b.storage_port)),
                    ("index.search.backend", Value::from(b.index_backend.as_str())),
                    ("index.search.hostname", Value::from(b.index_hostname.as_str())),
                    ("index.search.port", Value::from(b.index_port)),
                ],
            })
            .push(Statement::InitializeGraph { graph: name.to_string() });
        script
    }

    /// Create a graph with the configured storage and search backends.
    pub async fn create_graph(&self, name: &str) -> SchemaResult<()> {
        info!(graph = name, backend = %self.backend.storage_backend, "Creating graph");
        self.submit(&self.create_graph_script(name)).await?;
        Ok(())
    }

    /// Names of every graph the server knows.
    pub async fn list_graphs(&self) -> SchemaResult<Vec<String>> {
        let mut script = ScriptBuilder::new();
        script.push(Statement::ListGraphNames);
        let result = self.submit(&script).await?;
        string_list(&result).ok_or_else(|| SchemaError::unexpected(format!("graph names: {}", result)))
    }

    /// Whether `name` is among the server's graphs.
    ///
    /// A result that is not a list of names counts as "not present".
    pub async fn graph_exists(&self, name: &str) -> SchemaResult<bool> {
        debug!(graph = name, "Checking graph existence");
        let mut script = ScriptBuilder::new();
        script.push(Statement::ListGraphNames);
        let result = self.submit(&script).await?;

        match string_list(&result) {
            Some(names) => Ok(names.iter().any(|n| n == name)),
            None => {
                warn!(graph = name, result = %result, "Graph name listing was not a list");
                Ok(false)
            }
        }
    }

    /// Create `name` unless it already exists. Returns `true` if it was created.
    pub async fn ensure_graph(&self, name: &str) -> SchemaResult<bool> {
        if self.graph_exists(name).await? {
            debug!(graph = name, "Graph already exists");
            return Ok(false);
        }
        self.create_graph(name).await?;
        Ok(true)
    }

    /// Drop a graph. Dropping an unknown graph is left to the server.
    pub async fn drop_graph(&self, name: &str) -> SchemaResult<()> {
        info!(graph = name, "Dropping graph");
        let mut script = ScriptBuilder::new();
        script.push(Statement::DropGraph { graph: name.to_string() });
        self.submit(&script).await?;
        Ok(())
    }

    /// Script that ensures the vertex label, edge labels and property keys.
    pub fn mapping_script(&self, graph: &str, label: &str, mapping: &MappingDescriptor) -> ScriptBuilder {
        let mut script = ScriptBuilder::new();
        script
            .push(Statement::OpenGraph { graph: graph.to_string() })
            .push(Statement::CommitTransaction)
            .push(Statement::OpenManagement)
            .push(Statement::EnsureVertexLabel { label: label.to_string() });

        for (relation, multiplicity) in &mapping.relations {
            script.push(Statement::EnsureEdgeLabel {
                label: relation.clone(),
                multiplicity: *multiplicity,
            });
        }
        for (property, spec) in &mapping.properties {
            script.push(Statement::EnsurePropertyKey {
                key: property.clone(),
                data_type: spec.data_type,
                cardinality: spec.cardinality,
            });
        }
        script.push(Statement::CommitManagement);
        script
    }

    /// Bring `label`, its relations, properties and indexes up to date.
    pub async fn sync_mapping(
        &self,
        graph: &str,
        label: &str,
        mapping: &MappingDescriptor,
    ) -> SchemaResult<SyncReport> {
        if label.trim().is_empty() {
            return Err(SchemaError::invalid_mapping("vertex label name must not be empty"));
        }
        mapping.validate()?;

        info!(
            graph,
            label,
            relations = mapping.relations.len(),
            properties = mapping.properties.len(),
            "Syncing mapping"
        );
        self.submit(&self.mapping_script(graph, label, mapping)).await?;

        if mapping.indexes.is_empty() {
            return Ok(SyncReport::default());
        }
        self.sync_indexes(graph, label, &mapping.indexes).await
    }
}
