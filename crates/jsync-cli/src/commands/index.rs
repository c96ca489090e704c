//! Index inspection CLI commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use jsync_graph::JsyncConfig;

use super::connect;
use super::mapping::load_mapping;
use crate::output;

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Show the server-side status of every index in a mapping file
    Status {
        /// Target graph
        #[arg(long, short)]
        graph: String,

        /// Mapping file (.json or .toml)
        file: PathBuf,
    },
}

pub async fn execute(cmd: IndexCommands, config: &JsyncConfig) -> Result<()> {
    match cmd {
        IndexCommands::Status { graph, file } => cmd_status(config, &graph, &file).await,
    }
}

async fn cmd_status(config: &JsyncConfig, graph: &str, file: &Path) -> Result<()> {
    let mapping = load_mapping(file)?;
    if mapping.indexes.is_empty() {
        println!("{}", "Mapping declares no indexes.".dimmed());
        return Ok(());
    }

    let sync = connect(config)?;
    let statuses = sync.index_statuses(graph, &mapping.indexes).await?;
    output::print_index_statuses(&mapping, &statuses);
    Ok(())
}
