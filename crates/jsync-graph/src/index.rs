//! Index synchronization: build, await, enable.
//!
//! Indexes move through `ABSENT -> INSTALLED -> REGISTERED -> ENABLED` on the
//! server. We only issue the build and enable transitions and wait in between.
//! Which indexes already exist is checked up front, so build statements are
//! only emitted for indexes the server reports as absent.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::client::{string_list, ScriptClient};
use crate::config::AwaitStrategy;
use crate::error::{SchemaError, SchemaResult};
use crate::mapping::{validate_index, IndexSpec};
use crate::schema::SchemaSynchronizer;
use crate::script::{GraphIndexBacking, IndexRef, ScriptBuilder, Statement};

/// Index status as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexStatus {
    Absent,
    Installed,
    Registered,
    Enabled,
    Disabled,
    Discarded,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Absent => "ABSENT",
            IndexStatus::Installed => "INSTALLED",
            IndexStatus::Registered => "REGISTERED",
            IndexStatus::Enabled => "ENABLED",
            IndexStatus::Disabled => "DISABLED",
            IndexStatus::Discarded => "DISCARDED",
        }
    }

    /// States an index never leaves on its own.
    pub fn is_dead_end(&self) -> bool {
        matches!(self, IndexStatus::Disabled | IndexStatus::Discarded)
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexStatus {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ABSENT" => Ok(IndexStatus::Absent),
            "INSTALLED" => Ok(IndexStatus::Installed),
            "REGISTERED" => Ok(IndexStatus::Registered),
            "ENABLED" => Ok(IndexStatus::Enabled),
            "DISABLED" => Ok(IndexStatus::Disabled),
            "DISCARDED" => Ok(IndexStatus::Discarded),
            other => Err(SchemaError::unexpected(format!("unknown index status '{}'", other))),
        }
    }
}

/// What an index sync did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Indexes a build instruction was issued for.
    pub built: Vec<String>,
    /// Indexes an enable instruction was issued for.
    pub enabled: Vec<String>,
    /// Indexes that were already present before the sync.
    pub existing: Vec<String>,
}

/// Status lookup reference for a declared index.
pub fn index_ref(name: &str, spec: &IndexSpec) -> IndexRef {
    match spec {
        IndexSpec::Composite { keys, .. } | IndexSpec::Mixed { keys, .. } => IndexRef::Graph {
            name: name.to_string(),
            first_key: keys.first().cloned().unwrap_or_default(),
        },
        IndexSpec::VertexCentric { label, .. } => IndexRef::Relation {
            name: name.to_string(),
            edge_label: label.clone(),
        },
    }
}

/// Build statement for a declared index scoped to `vertex_label`.
pub fn build_statement(
    name: &str,
    spec: &IndexSpec,
    vertex_label: &str,
    default_search_index: &str,
) -> Statement {
    match spec {
        IndexSpec::Composite { keys, unique } => Statement::BuildGraphIndex {
            name: name.to_string(),
            keys: keys.clone(),
            vertex_label: vertex_label.to_string(),
            unique: *unique,
            backing: GraphIndexBacking::Composite,
        },
        IndexSpec::Mixed { keys, unique, backend } => Statement::BuildGraphIndex {
            name: name.to_string(),
            keys: keys.clone(),
            vertex_label: vertex_label.to_string(),
            unique: *unique,
            backing: GraphIndexBacking::Mixed(
                backend.clone().unwrap_or_else(|| default_search_index.to_string()),
            ),
        },
        IndexSpec::VertexCentric { keys, label, direction, order } => Statement::BuildRelationIndex {
            name: name.to_string(),
            edge_label: label.clone(),
            direction: *direction,
            order: *order,
            keys: keys.clone(),
        },
    }
}

const AWAIT_BUILT: &[IndexStatus] = &[IndexStatus::Registered, IndexStatus::Enabled];
const AWAIT_ENABLED: &[IndexStatus] = &[IndexStatus::Enabled];

impl<C: ScriptClient> SchemaSynchronizer<C> {
    /// Current status of each index, in declaration order.
    pub async fn index_statuses(
        &self,
        graph: &str,
        indexes: &IndexMap<String, IndexSpec>,
    ) -> SchemaResult<Vec<(String, IndexStatus)>> {
        for (name, spec) in indexes {
            validate_index(name, spec)?;
        }
        let refs: Vec<IndexRef> = indexes.iter().map(|(n, s)| index_ref(n, s)).collect();
        let statuses = self.fetch_statuses(graph, &refs).await?;
        Ok(indexes.keys().cloned().zip(statuses).collect())
    }

    /// Build, enable and await every index in `indexes` for `vertex_label`.
    ///
    /// Any failed submission aborts the remaining phases. Whatever the server
    /// already applied stays applied; re-running converges.
    pub async fn sync_indexes(
        &self,
        graph: &str,
        vertex_label: &str,
        indexes: &IndexMap<String, IndexSpec>,
    ) -> SchemaResult<SyncReport> {
        let mut report = SyncReport::default();
        if indexes.is_empty() {
            return Ok(report);
        }
        for (name, spec) in indexes {
            validate_index(name, spec)?;
        }

        info!(graph, label = vertex_label, count = indexes.len(), "Syncing indexes");

        let refs: Vec<IndexRef> = indexes.iter().map(|(n, s)| index_ref(n, s)).collect();
        let current = self.fetch_statuses(graph, &refs).await?;

        let mut builds = Vec::new();
        for ((name, spec), status) in indexes.iter().zip(&current) {
            if *status == IndexStatus::Absent {
                builds.push(build_statement(name, spec, vertex_label, &self.backend().index_name));
                report.built.push(name.clone());
            } else {
                debug!(index = %name, %status, "Index already present, skipping build");
                report.existing.push(name.clone());
            }
        }

        match self.await_config().strategy {
            AwaitStrategy::Poll => {
                if !builds.is_empty() {
                    let mut script = ScriptBuilder::new();
                    script
                        .push(Statement::OpenGraph { graph: graph.to_string() })
                        .push(Statement::CommitTransaction)
                        .push(Statement::OpenManagement);
                    for build in builds {
                        script.push(build);
                    }
                    script.push(Statement::CommitManagement);
                    self.submit(&script).await?;
                }

                let statuses = self.await_statuses(graph, &refs, AWAIT_BUILT).await?;

                let registered: Vec<&IndexRef> = refs
                    .iter()
                    .zip(&statuses)
                    .filter(|(_, s)| **s == IndexStatus::Registered)
                    .map(|(r, _)| r)
                    .collect();
                if !registered.is_empty() {
                    let mut script = ScriptBuilder::new();
                    script
                        .push(Statement::OpenGraph { graph: graph.to_string() })
                        .push(Statement::OpenManagement);
                    for index in &registered {
                        script.push(Statement::EnableIfRegistered { index: (*index).clone() });
                        report.enabled.push(index.name().to_string());
                    }
                    script.push(Statement::CommitManagement);
                    self.submit(&script).await?;
                }

                self.await_statuses(graph, &refs, AWAIT_ENABLED).await?;
            }
            AwaitStrategy::Backend => {
                let timeout = self.await_config().timeout();
                let mut script = ScriptBuilder::new();
                script
                    .push(Statement::OpenGraph { graph: graph.to_string() })
                    .push(Statement::CommitTransaction)
                    .push(Statement::OpenManagement);
                for build in builds {
                    script.push(build);
                }
                script.push(Statement::CommitManagement);
                for index in &refs {
                    script.push(Statement::AwaitStatus {
                        index: index.clone(),
                        statuses: AWAIT_BUILT.to_vec(),
                        timeout,
                    });
                }
                script.push(Statement::OpenManagement);
                for index in &refs {
                    script.push(Statement::EnableIfRegistered { index: index.clone() });
                }
                script.push(Statement::CommitManagement);
                for index in &refs {
                    script.push(Statement::AwaitStatus {
                        index: index.clone(),
                        statuses: AWAIT_ENABLED.to_vec(),
                        timeout,
                    });
                }
                script.push(Statement::ReturnEnabled);
                let result = self.submit(&script).await?;

                report.enabled = string_list(&result)
                    .ok_or_else(|| SchemaError::unexpected(format!("enabled indexes: {}", result)))?;
            }
        }

        info!(
            graph,
            built = report.built.len(),
            enabled = report.enabled.len(),
            existing = report.existing.len(),
            "Indexes synced"
        );
        Ok(report)
    }

    /// Run the status inspection script once.
    async fn fetch_statuses(&self, graph: &str, refs: &[IndexRef]) -> SchemaResult<Vec<IndexStatus>> {
        let mut script = ScriptBuilder::new();
        script
            .push(Statement::OpenGraph { graph: graph.to_string() })
            .push(Statement::OpenManagement)
            .push(Statement::CollectStatuses { indexes: refs.to_vec() })
            .push(Statement::RollbackManagement)
            .push(Statement::ReturnStatuses);

        let result = self.submit(&script).await?;
        let names = string_list(&result)
            .ok_or_else(|| SchemaError::unexpected(format!("index statuses: {}", result)))?;
        if names.len() != refs.len() {
            return Err(SchemaError::unexpected(format!(
                "expected {} index statuses, got {}",
                refs.len(),
                names.len()
            )));
        }
        names.iter().map(|s| s.parse()).collect()
    }

    /// Poll until every index is in one of `targets`.
    async fn await_statuses(
        &self,
        graph: &str,
        refs: &[IndexRef],
        targets: &[IndexStatus],
    ) -> SchemaResult<Vec<IndexStatus>> {
        let config = self.await_config();
        let timeout = config.timeout();
        let started = Instant::now();
        let mut interval = config.initial_interval();

        loop {
            let statuses = self.fetch_statuses(graph, refs).await?;

            if let Some((index, status)) = refs.iter().zip(&statuses).find(|(_, s)| s.is_dead_end()) {
                return Err(SchemaError::IndexState {
                    index: index.name().to_string(),
                    status: *status,
                });
            }

            let pending = refs
                .iter()
                .zip(&statuses)
                .find(|(_, s)| !targets.contains(*s))
                .map(|(r, s)| (r, *s));
            let Some((index, status)) = pending else {
                return Ok(statuses);
            };

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(SchemaError::IndexTimeout {
                    index: index.name().to_string(),
                    waited,
                });
            }

            debug!(index = index.name(), %status, ?interval, "Waiting for index status");
            tokio::time::sleep(interval.min(timeout - waited)).await;
            interval = config.next_interval(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AwaitConfig, JsyncConfig};
    use crate::mapping::{Direction, SortOrder};
    use crate::testing::RecordingClient;
    use serde_json::json;
    use std::sync::Arc;

    fn poll_config() -> JsyncConfig {
        let mut config = JsyncConfig::default();
        config.await_ = AwaitConfig {
            initial_interval_ms: 1,
            max_interval_ms: 2,
            ..AwaitConfig::default()
        };
        config
    }

    fn person_indexes() -> IndexMap<String, IndexSpec> {
        let mut indexes = IndexMap::new();
        indexes.insert(
            "byEmail".to_string(),
            IndexSpec::Composite { keys: vec!["email".to_string()], unique: true },
        );
        indexes.insert(
            "knowsBySince".to_string(),
            IndexSpec::VertexCentric {
                keys: vec!["since".to_string()],
                label: "knows".to_string(),
                direction: Direction::Out,
                order: SortOrder::Asc,
            },
        );
        indexes
    }

    fn is_status_script(text: &str) -> bool {
        text.contains("statuses = [];")
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("REGISTERED".parse::<IndexStatus>().unwrap(), IndexStatus::Registered);
        assert!("enabled".parse::<IndexStatus>().is_err());
        assert!(IndexStatus::Disabled.is_dead_end());
        assert!(!IndexStatus::Installed.is_dead_end());
    }

    #[test]
    fn test_index_refs_by_kind() {
        let indexes = person_indexes();
        assert_eq!(
            index_ref("byEmail", &indexes["byEmail"]),
            IndexRef::Graph { name: "byEmail".to_string(), first_key: "email".to_string() }
        );
        assert_eq!(
            index_ref("knowsBySince", &indexes["knowsBySince"]),
            IndexRef::Relation { name: "knowsBySince".to_string(), edge_label: "knows".to_string() }
        );
    }

    #[test]
    fn test_mixed_index_defaults_to_configured_backend() {
        let spec = IndexSpec::Mixed { keys: vec!["bio".to_string()], unique: false, backend: None };
        let stmt = build_statement("byBio", &spec, "person", "search");
        assert!(matches!(
            stmt,
            Statement::BuildGraphIndex { backing: GraphIndexBacking::Mixed(ref b), .. } if b == "search"
        ));
    }

    #[tokio::test]
    async fn test_full_lifecycle_with_polling() {
        // absent -> registered -> enabled
        let mut rounds = 0;
        let client = RecordingClient::new(move |script| {
            if !is_status_script(&script.text) {
                return Ok(json!([null]));
            }
            rounds += 1;
            Ok(match rounds {
                1 => json!(["ABSENT", "ABSENT"]),
                2 => json!(["INSTALLED", "REGISTERED"]),
                3 => json!(["REGISTERED", "REGISTERED"]),
                _ => json!(["ENABLED", "ENABLED"]),
            })
        });
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &poll_config());

        let report = sync.sync_indexes("social", "person", &person_indexes()).await.unwrap();

        assert_eq!(report.built, vec!["byEmail", "knowsBySince"]);
        assert_eq!(report.enabled, vec!["byEmail", "knowsBySince"]);
        assert!(report.existing.is_empty());
        assert_eq!(client.count_containing("buildCompositeIndex"), 1);
        assert_eq!(client.count_containing("buildEdgeIndex"), 1);
        assert_eq!(client.count_containing("SchemaAction.ENABLE_INDEX"), 1);
    }

    #[tokio::test]
    async fn test_present_indexes_are_not_rebuilt() {
        let client = RecordingClient::new(|script| {
            if is_status_script(&script.text) {
                Ok(json!(["ENABLED", "ABSENT"]))
            } else {
                Ok(json!([null]))
            }
        });
        let mut config = poll_config();
        config.await_.timeout_secs = 0;
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &config);

        // The relation index never shows up, so the wait gives up.
        let err = sync.sync_indexes("social", "person", &person_indexes()).await.unwrap_err();
        assert!(matches!(err, SchemaError::IndexTimeout { ref index, .. } if index == "knowsBySince"));

        let builds: Vec<_> = client
            .scripts()
            .into_iter()
            .filter(|s| s.text.contains("buildIndex") || s.text.contains("buildEdgeIndex"))
            .collect();
        assert_eq!(builds.len(), 1);
        assert!(builds[0].bindings_for("byEmail").is_empty());
        assert!(!builds[0].bindings_for("knowsBySince").is_empty());
        assert!(!builds[0].text.contains("buildCompositeIndex"));
    }

    #[tokio::test]
    async fn test_enabled_indexes_skip_every_write() {
        let client = RecordingClient::new(|_| Ok(json!(["ENABLED", "ENABLED"])));
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &poll_config());

        let report = sync.sync_indexes("social", "person", &person_indexes()).await.unwrap();

        assert_eq!(report.existing, vec!["byEmail", "knowsBySince"]);
        assert!(report.built.is_empty() && report.enabled.is_empty());
        assert!(client.scripts().iter().all(|s| is_status_script(&s.text)));
    }

    #[tokio::test]
    async fn test_disabled_index_fails_fast() {
        let client = RecordingClient::new(|_| Ok(json!(["DISABLED", "ENABLED"])));
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &poll_config());

        let err = sync.sync_indexes("social", "person", &person_indexes()).await.unwrap_err();
        assert!(matches!(
            err,
            SchemaError::IndexState { status: IndexStatus::Disabled, ref index } if index == "byEmail"
        ));
    }

    #[tokio::test]
    async fn test_build_failure_stops_later_phases() {
        let client = RecordingClient::new(|script| {
            if is_status_script(&script.text) {
                Ok(json!(["ABSENT", "ABSENT"]))
            } else {
                Err(SchemaError::backend(500, "Property key with name 'email' does not exist"))
            }
        });
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &poll_config());

        let err = sync.sync_indexes("social", "person", &person_indexes()).await.unwrap_err();
        assert!(matches!(err, SchemaError::Backend { code: 500, .. }));
        // inspection + failed build, nothing after
        assert_eq!(client.scripts().len(), 2);
    }

    #[tokio::test]
    async fn test_backend_strategy_sends_one_script() {
        let client = RecordingClient::new(|script| {
            if is_status_script(&script.text) {
                Ok(json!(["ABSENT", "ENABLED"]))
            } else {
                Ok(json!([["byEmail"]]))
            }
        });
        let mut config = JsyncConfig::default();
        config.await_.strategy = AwaitStrategy::Backend;
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &config);

        let report = sync.sync_indexes("social", "person", &person_indexes()).await.unwrap();
        assert_eq!(report.built, vec!["byEmail"]);
        assert_eq!(report.enabled, vec!["byEmail"]);

        let scripts = client.scripts();
        assert_eq!(scripts.len(), 2);
        let text = &scripts[1].text;
        let build = text.find("buildCompositeIndex").unwrap();
        let first_commit = text.find("mgmt.commit();").unwrap();
        let enable = text.find("SchemaAction.ENABLE_INDEX").unwrap();
        let last_await = text.rfind("status(SchemaStatus.ENABLED)").unwrap();
        assert!(build < first_commit && first_commit < enable && enable < last_await);
        assert!(!text.contains("buildEdgeIndex"));
        assert!(text.contains("ManagementSystem.awaitRelationIndexStatus(graph, index1, edgeLabel0)"));
        assert!(text.contains("ManagementSystem.awaitGraphIndexStatus(graph, index0)"));
        assert!(text.ends_with("enabled\n"));
    }

    #[tokio::test]
    async fn test_backend_strategy_reports_what_the_server_enabled() {
        // Only the server knows which index it found REGISTERED.
        let client = RecordingClient::new(|script| {
            if is_status_script(&script.text) {
                Ok(json!(["ABSENT", "INSTALLED"]))
            } else {
                Ok(json!(["byEmail"]))
            }
        });
        let mut config = JsyncConfig::default();
        config.await_.strategy = AwaitStrategy::Backend;
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &config);

        let report = sync.sync_indexes("social", "person", &person_indexes()).await.unwrap();
        assert_eq!(report.built, vec!["byEmail"]);
        assert_eq!(report.existing, vec!["knowsBySince"]);
        assert_eq!(report.enabled, vec!["byEmail"]);
    }

    #[tokio::test]
    async fn test_backend_strategy_rejects_malformed_enabled_list() {
        let client = RecordingClient::new(|script| {
            if is_status_script(&script.text) {
                Ok(json!(["ABSENT", "ABSENT"]))
            } else {
                Ok(json!({"enabled": 2}))
            }
        });
        let mut config = JsyncConfig::default();
        config.await_.strategy = AwaitStrategy::Backend;
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &config);

        let err = sync.sync_indexes("social", "person", &person_indexes()).await.unwrap_err();
        assert!(matches!(err, SchemaError::UnexpectedResponse(_)));
    }

    #[tokio::test]
    async fn test_status_lookup_rejects_index_without_keys() {
        let client = RecordingClient::new(|_| Ok(json!(["ENABLED"])));
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &poll_config());
        let mut indexes = IndexMap::new();
        indexes.insert("byNothing".to_string(), IndexSpec::Composite { keys: vec![], unique: false });

        let err = sync.index_statuses("social", &indexes).await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidMapping(_)));
        assert!(client.scripts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_map_is_a_no_op() {
        let client = RecordingClient::new(|_| Ok(json!([])));
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &poll_config());
        let report = sync.sync_indexes("social", "person", &IndexMap::new()).await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert!(client.scripts().is_empty());
    }

    #[tokio::test]
    async fn test_status_count_mismatch_is_unexpected() {
        let client = RecordingClient::new(|_| Ok(json!(["ENABLED"])));
        let sync = SchemaSynchronizer::new(Arc::clone(&client), &poll_config());
        let err = sync.index_statuses("social", &person_indexes()).await.unwrap_err();
        assert!(matches!(err, SchemaError::UnexpectedResponse(_)));
    }
}
