// src/cli/mod.rs — CLI definition (clap derive)

pub mod cache;
pub mod list;
pub mod render;
pub mod run;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::infra::config::Config;
use crate::registry::{ModuleLoader, Registry};
use crate::scheduler::ModuleSelection;

#[derive(Parser)]
#[command(
    name = "recon-progressive",
    about = "Modular reconnaissance toolkit",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List modules grouped by category
    List,
    /// Show the profiles a module supports
    Profiles {
        /// Module name
        module: String,
    },
    /// Run one or more modules against a target
    Run(RunArgs),
    /// Manage cached results
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Domain, hostname or IP address
    pub target: String,

    /// Module to run, optionally with a profile (repeatable)
    #[arg(
        short,
        long = "module",
        value_name = "MODULE[:PROFILE]",
        required = true
    )]
    pub modules: Vec<ModuleSelection>,

    /// Extra arguments for parameterised profiles (nmap:custom)
    #[arg(long, allow_hyphen_values = true)]
    pub args: Option<String>,

    /// Ignore cached results
    #[arg(long)]
    pub no_cache: bool,

    /// Do not write results back to the cache
    #[arg(long)]
    pub no_store: bool,

    /// Per-invocation timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Save results under the configured output directory
    #[arg(long)]
    pub save: bool,

    /// Save --args as a named nmap profile for later runs
    #[arg(long, value_name = "NAME", requires = "args")]
    pub save_profile: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Remove cached results (all of them, or one target's)
    Clear {
        #[arg(long)]
        target: Option<String>,
    },
    /// Remove expired entries
    Purge,
}

/// Discover the compiled-in modules, honouring `[modules.<name>].enabled`.
pub fn discover(config: &Config) -> Arc<Registry> {
    Arc::new(ModuleLoader::builtin().with_config(config).discover())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch_run() {
        let cli = Cli::parse_from([
            "recon-progressive",
            "run",
            "example.com",
            "-m",
            "whois",
            "-m",
            "dig:mx",
            "--no-cache",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.target, "example.com");
        assert_eq!(args.modules.len(), 2);
        assert_eq!(args.modules[1].profile.as_deref(), Some("mx"));
        assert!(args.no_cache);
        assert!(!args.no_store);
    }

    #[test]
    fn test_custom_args_accept_leading_hyphen() {
        let cli = Cli::parse_from([
            "recon-progressive",
            "run",
            "10.0.0.1",
            "-m",
            "nmap:custom",
            "--args",
            "-p 1-100 -sV",
            "--save-profile",
            "quick",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.args.as_deref(), Some("-p 1-100 -sV"));
        assert_eq!(args.save_profile.as_deref(), Some("quick"));
    }

    #[test]
    fn test_save_profile_requires_args() {
        let result = Cli::try_parse_from([
            "recon-progressive",
            "run",
            "10.0.0.1",
            "-m",
            "nmap:custom",
            "--save-profile",
            "quick",
        ]);
        assert!(result.is_err());
    }
}
