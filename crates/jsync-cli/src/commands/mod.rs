//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use jsync_graph::{GremlinHttpClient, JsyncConfig, SchemaSynchronizer};

pub mod graph;
pub mod index;
pub mod mapping;

/// JanusGraph schema synchronizer
#[derive(Parser)]
#[command(name = "jsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "JSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Gremlin Server URL, overrides the configuration file
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Graph lifecycle commands
    #[command(subcommand)]
    Graph(graph::GraphCommands),

    /// Vertex label mapping commands
    #[command(subcommand)]
    Mapping(mapping::MappingCommands),

    /// Index inspection commands
    #[command(subcommand)]
    Index(index::IndexCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.load_config()?;

        match self.command {
            Commands::Graph(cmd) => graph::execute(cmd, &config).await,
            Commands::Mapping(cmd) => mapping::execute(cmd, &config).await,
            Commands::Index(cmd) => index::execute(cmd, &config).await,
        }
    }

    /// Defaults, then the config file, then `JSYNC_URL`, then `--url`.
    fn load_config(&self) -> Result<JsyncConfig> {
        let config = match &self.config {
            Some(path) => JsyncConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => JsyncConfig::default(),
        };
        let mut config = config.with_env_overrides();
        if let Some(url) = &self.url {
            config.endpoint.url = url.clone();
        }
        Ok(config)
    }
}

/// Build a synchronizer talking to the configured endpoint.
pub(crate) fn connect(config: &JsyncConfig) -> Result<SchemaSynchronizer<GremlinHttpClient>> {
    let client = GremlinHttpClient::new(&config.endpoint).context("Failed to build Gremlin HTTP client")?;
    tracing::debug!(url = client.url(), "Using Gremlin endpoint");
    Ok(SchemaSynchronizer::new(client, config))
}
