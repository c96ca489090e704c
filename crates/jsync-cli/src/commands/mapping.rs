//! Mapping CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use jsync_graph::{JsyncConfig, MappingDescriptor};

use super::connect;
use crate::output;

#[derive(Subcommand)]
pub enum MappingCommands {
    /// Create missing labels, property keys and indexes for a vertex label
    Sync(TargetArgs),

    /// Print a parsed mapping file
    Show {
        /// Mapping file (.json or .toml)
        file: PathBuf,
    },

    /// Print the mapping script and its bindings without running it
    Script(TargetArgs),
}

#[derive(Args)]
pub struct TargetArgs {
    /// Target graph
    #[arg(long, short)]
    pub graph: String,

    /// Vertex label the mapping describes
    #[arg(long, short)]
    pub label: String,

    /// Mapping file (.json or .toml)
    pub file: PathBuf,

    /// Create the graph first if it does not exist (sync only)
    #[arg(long)]
    pub ensure_graph: bool,
}

pub async fn execute(cmd: MappingCommands, config: &JsyncConfig) -> Result<()> {
    match cmd {
        MappingCommands::Sync(args) => cmd_sync(config, args).await,
        MappingCommands::Show { file } => cmd_show(&file),
        MappingCommands::Script(args) => cmd_script(config, args),
    }
}

pub(crate) fn load_mapping(path: &Path) -> Result<MappingDescriptor> {
    let mapping = MappingDescriptor::load(path)
        .with_context(|| format!("Failed to read mapping {}", path.display()))?;
    mapping.validate()?;
    Ok(mapping)
}

async fn cmd_sync(config: &JsyncConfig, args: TargetArgs) -> Result<()> {
    let mapping = load_mapping(&args.file)?;
    let sync = connect(config)?;

    if args.ensure_graph && sync.ensure_graph(&args.graph).await? {
        println!("{} Graph {} created", "✓".green(), args.graph.cyan());
    }

    println!(
        "{} {} {} {}",
        "Syncing".bold(),
        args.label.cyan(),
        "into".bold(),
        args.graph.yellow()
    );

    let report = sync
        .sync_mapping(&args.graph, &args.label, &mapping)
        .await
        .with_context(|| format!("Failed to sync mapping for '{}'", args.label))?;

    println!(
        "  {} {} relations, {} properties",
        "✓".green(),
        mapping.relations.len(),
        mapping.properties.len()
    );
    output::print_sync_report(&report);
    Ok(())
}

fn cmd_show(file: &Path) -> Result<()> {
    let mapping = load_mapping(file)?;
    output::print_mapping(&mapping);
    Ok(())
}

fn cmd_script(config: &JsyncConfig, args: TargetArgs) -> Result<()> {
    let mapping = load_mapping(&args.file)?;
    let sync = connect(config)?;
    let script = sync.mapping_script(&args.graph, &args.label, &mapping).build();
    output::print_script(&script)?;
    Ok(())
}
