// src/commands/query.rs
//! Read-only commands

use super::{open_db, parse_package, print_json};
use anyhow::{Context, Result};
use ppm::operation::installed_packs;
use ppm::resolver::plan_dependencies;
use ppm::{Config, DirectoryProvider, Uninstall};

/// Print the objects still using a pack's objects
pub fn cmd_check_used(config: &Config, arg: &str) -> Result<()> {
    let package = parse_package(arg)?;
    let mut conn = open_db(config)?;
    let provider = DirectoryProvider::new(&config.catalog_dir);

    let references = Uninstall::new(&mut conn, &provider, config.sorter)
        .check_used(&package)
        .with_context(|| format!("Failed to check usage of {}", arg))?;
    print_json(&references)
}

/// Print the dependencies of a pack that still need work
pub fn cmd_check_deps(config: &Config, arg: &str) -> Result<()> {
    let package = parse_package(arg)?;
    let conn = open_db(config)?;
    let provider = DirectoryProvider::new(&config.catalog_dir);

    let plan = plan_dependencies(&conn, &provider, &package)
        .with_context(|| format!("Failed to resolve dependencies of {}", arg))?;
    print_json(&plan)
}

/// List installed packs
pub fn cmd_list(config: &Config) -> Result<()> {
    let conn = open_db(config)?;
    let packs = installed_packs(&conn).context("Failed to list plugin packs")?;
    if packs.is_empty() {
        println!("No plugin packs installed");
        return Ok(());
    }
    for pack in &packs {
        let marker = if pack.complete { " " } else { "!" };
        println!(
            "{} {} {} ({})",
            marker,
            pack.slug,
            pack.version,
            pack.status.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}
