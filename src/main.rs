// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli.global)?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&config),
        Commands::Install { packages, with_deps } => commands::cmd_install(&config, &packages, with_deps),
        Commands::Update { packages } => commands::cmd_update(&config, &packages),
        Commands::Reinstall { packages } => commands::cmd_reinstall(&config, &packages),
        Commands::Uninstall { packages, force } => commands::cmd_uninstall(&config, &packages, force),
        Commands::CheckUsed { package } => commands::cmd_check_used(&config, &package),
        Commands::CheckDeps { package } => commands::cmd_check_deps(&config, &package),
        Commands::List => commands::cmd_list(&config),
    }
}
