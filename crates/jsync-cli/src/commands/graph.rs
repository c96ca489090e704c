//! Graph lifecycle CLI commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use jsync_graph::JsyncConfig;

use super::connect;

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Create a graph with the configured storage and search backends
    Create {
        /// Graph name
        name: String,
    },

    /// Create a graph only if it does not exist yet
    Ensure {
        /// Graph name
        name: String,
    },

    /// Check whether a graph exists
    Exists {
        /// Graph name
        name: String,
    },

    /// List graphs known to the server
    List,

    /// Drop a graph (destroys all data)
    Drop {
        /// Graph name
        name: String,
        /// Confirm destructive operation
        #[arg(long)]
        confirm: bool,
    },
}

pub async fn execute(cmd: GraphCommands, config: &JsyncConfig) -> Result<()> {
    match cmd {
        GraphCommands::Create { name } => cmd_create(config, &name).await,
        GraphCommands::Ensure { name } => cmd_ensure(config, &name).await,
        GraphCommands::Exists { name } => cmd_exists(config, &name).await,
        GraphCommands::List => cmd_list(config).await,
        GraphCommands::Drop { name, confirm } => cmd_drop(config, &name, confirm).await,
    }
}

async fn cmd_create(config: &JsyncConfig, name: &str) -> Result<()> {
    let sync = connect(config)?;
    sync.create_graph(name).await?;
    println!("{} Graph {} created", "✓".green(), name.cyan());
    Ok(())
}

async fn cmd_ensure(config: &JsyncConfig, name: &str) -> Result<()> {
    let sync = connect(config)?;
    if sync.ensure_graph(name).await? {
        println!("{} Graph {} created", "✓".green(), name.cyan());
    } else {
        println!("{} Graph {} already exists", "•".dimmed(), name.cyan());
    }
    Ok(())
}

async fn cmd_exists(config: &JsyncConfig, name: &str) -> Result<()> {
    let sync = connect(config)?;
    if sync.graph_exists(name).await? {
        println!("{} {}", name.cyan(), "exists".green());
    } else {
        println!("{} {}", name.cyan(), "does not exist".yellow());
    }
    Ok(())
}

async fn cmd_list(config: &JsyncConfig) -> Result<()> {
    let sync = connect(config)?;
    let mut names = sync.list_graphs().await?;
    names.sort();

    if names.is_empty() {
        println!("{}", "No graphs found.".dimmed());
        return Ok(());
    }
    for name in &names {
        println!("  {} {}", "•".dimmed(), name);
    }
    println!("\n{} graphs.", names.len().to_string().bold());
    Ok(())
}

async fn cmd_drop(config: &JsyncConfig, name: &str, confirm: bool) -> Result<()> {
    if !confirm {
        println!("{} {}", "This will permanently delete graph".red().bold(), name.cyan());
        println!("Run with {} to confirm.", "--confirm".bold());
        return Ok(());
    }

    let sync = connect(config)?;
    sync.drop_graph(name).await?;
    println!("{} Graph {} dropped", "✓".green(), name.cyan());
    Ok(())
}
