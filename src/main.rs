// src/main.rs — recon-progressive entry point

use std::path::Path;

use clap::Parser;

use recon_progressive::cli::{self, Cli, Commands};
use recon_progressive::infra::config::Config;
use recon_progressive::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG overrides either level
    logger::init_logging(if cli.verbose { "debug" } else { "warn" });

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = match &cli.config {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::List => {
            cli::list::show_modules(&cli::discover(&config));
            Ok(())
        }
        Commands::Profiles { module } => {
            cli::list::show_profiles(&cli::discover(&config), &module)
        }
        Commands::Run(args) => cli::run::run_scan(args, &config).await,
        Commands::Cache { action } => cli::cache::run_cache(action),
    }
}
