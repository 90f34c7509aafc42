// src/cli.rs
//! CLI definitions for the plugin pack manager
//!
//! The command implementations live in the `commands` module.

use clap::{Args, Parser, Subcommand};
use ppm::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ppm")]
#[command(version)]
#[command(about = "Install, update and remove monitoring plugin packs", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides applied on top of the configuration file
#[derive(Args)]
pub struct GlobalArgs {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Path to the database file
    #[arg(short, long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Root of the manifest catalog
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create and migrate the database
    Init,

    /// Install plugin packs (`slug` or `slug@version`)
    Install {
        #[arg(required = true)]
        packages: Vec<String>,

        /// Install or upgrade missing dependencies first
        #[arg(long)]
        with_deps: bool,
    },

    /// Update installed plugin packs
    Update {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Update each plugin pack on its own, continuing past failures
    Reinstall {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Remove installed plugin packs
    Uninstall {
        #[arg(required = true)]
        packages: Vec<String>,

        /// Remove even when objects outside the packs still use them
        #[arg(long)]
        force: bool,
    },

    /// List objects outside a plugin pack that still use its objects
    CheckUsed {
        package: String,
    },

    /// Show the dependencies of a plugin pack that need installing or upgrading
    CheckDeps {
        package: String,
    },

    /// List installed plugin packs
    List,
}
