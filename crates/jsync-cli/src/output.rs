//! Terminal output formatting.

use anyhow::Result;
use colored::{ColoredString, Colorize};

use jsync_graph::{IndexStatus, MappingDescriptor, Script, SyncReport};

/// Print a parsed mapping.
pub fn print_mapping(mapping: &MappingDescriptor) {
    println!("{}", "Relations".bold());
    if mapping.relations.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for (name, multiplicity) in &mapping.relations {
        println!("  {:<30} {}", name.cyan(), multiplicity.as_str());
    }

    println!("\n{}", "Properties".bold());
    if mapping.properties.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for (name, spec) in &mapping.properties {
        println!(
            "  {:<30} {:<12} {}",
            name.cyan(),
            format!("{:?}", spec.data_type),
            spec.cardinality.as_str().dimmed()
        );
    }

    println!("\n{}", "Indexes".bold());
    if mapping.indexes.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for (name, spec) in &mapping.indexes {
        println!(
            "  {:<30} {:<15} [{}]",
            name.cyan(),
            spec.kind().to_string(),
            spec.keys().join(", ")
        );
    }
}

/// Print what an index sync did.
pub fn print_sync_report(report: &SyncReport) {
    for name in &report.built {
        println!("  {} built index {}", "✓".green(), name.cyan());
    }
    for name in &report.enabled {
        println!("  {} enabled index {}", "✓".green(), name.cyan());
    }
    for name in &report.existing {
        println!("  {} index {} already present", "•".dimmed(), name.cyan());
    }
}

/// Print index statuses next to their declared kind.
pub fn print_index_statuses(mapping: &MappingDescriptor, statuses: &[(String, IndexStatus)]) {
    println!("{:<30} {:<15} {}", "Index", "Kind", "Status");
    println!("{}", "-".repeat(60));
    for (name, status) in statuses {
        let kind = mapping
            .indexes
            .get(name)
            .map(|spec| spec.kind().to_string())
            .unwrap_or_default();
        println!("{:<30} {:<15} {}", name, kind, status_colored(*status));
    }
}

fn status_colored(status: IndexStatus) -> ColoredString {
    match status {
        IndexStatus::Enabled => status.as_str().green(),
        IndexStatus::Registered | IndexStatus::Installed => status.as_str().yellow(),
        IndexStatus::Absent => status.as_str().dimmed(),
        IndexStatus::Disabled | IndexStatus::Discarded => status.as_str().red(),
    }
}

/// Print a rendered script followed by its bindings.
pub fn print_script(script: &Script) -> Result<()> {
    println!("{}", "// script".dimmed());
    print!("{}", script.text);
    println!("{}", "// bindings".dimmed());
    println!("{}", serde_json::to_string_pretty(&script.bindings)?);
    Ok(())
}
