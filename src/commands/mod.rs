// src/commands/mod.rs
//! Command handlers for the ppm CLI

mod operation;
mod query;

pub use operation::{cmd_install, cmd_reinstall, cmd_uninstall, cmd_update};
pub use query::{cmd_check_deps, cmd_check_used, cmd_list};

use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use ppm::{Config, PackageDescriptor};
use serde::Serialize;
use tracing::info;

/// Configuration file with the command-line overrides applied
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = Config::load(&global.config)
        .with_context(|| format!("Failed to load configuration from {}", global.config.display()))?;
    if let Some(db_path) = &global.db_path {
        config.db_path = db_path.clone();
    }
    if let Some(catalog) = &global.catalog {
        config.catalog_dir = catalog.clone();
    }
    Ok(config)
}

/// Create and migrate the database
pub fn cmd_init(config: &Config) -> Result<()> {
    info!("Initializing database at: {}", config.db_path.display());
    ppm::db::init(&config.db_path)
        .with_context(|| format!("Failed to initialize {}", config.db_path.display()))?;
    println!("Database initialized successfully at: {}", config.db_path.display());
    Ok(())
}

fn open_db(config: &Config) -> Result<rusqlite::Connection> {
    ppm::db::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))
}

/// Parse a `slug` / `slug@version` argument
fn parse_package(arg: &str) -> Result<PackageDescriptor> {
    PackageDescriptor::parse_arg(arg).with_context(|| format!("Invalid package '{}'", arg))
}

fn parse_packages(args: &[String]) -> Result<Vec<PackageDescriptor>> {
    args.iter().map(|arg| parse_package(arg)).collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
