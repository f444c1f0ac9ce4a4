// src/cli/run.rs — `run` subcommand

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{render, RunArgs};
use crate::cache::ResultCache;
use crate::infra::config::Config;
use crate::infra::paths;
use crate::modules::scanning::NmapModule;
use crate::scheduler::{ExecutionRequest, ExecutionSettings, RunOptions, Scheduler};

/// Run the selected modules. One selection takes the single-request path;
/// several run as a concurrent batch. Ctrl-C cancels whatever is still
/// running and keeps what already finished.
pub async fn run_scan(args: RunArgs, config: &Config) -> anyhow::Result<()> {
    paths::ensure_dirs().await?;

    let extra_args = split_args(args.args.as_deref());
    if let Some(name) = &args.save_profile {
        NmapModule::save_user_profile(&paths::nmap_profiles_path(), name, &extra_args)?;
        eprintln!("Saved nmap profile '{name}'");
    }

    let registry = super::discover(config);
    let cache = Arc::new(ResultCache::persistent(paths::cache_dir())?);
    let scheduler = Scheduler::new(
        registry.clone(),
        cache,
        ExecutionSettings::from_config(config),
    );

    let options = RunOptions {
        bypass_cache: args.no_cache.then_some(true),
        store: !args.no_store,
        timeout: args.timeout.map(Duration::from_secs),
        args: extra_args,
    };
    let pairs: Vec<(String, String)> = args.modules.iter().map(|s| s.resolve(&registry)).collect();

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, cancelling running modules...");
                cancel.cancel();
            }
        })
    };

    let save = args.save || config.global.save_output;
    if let [(module, profile)] = pairs.as_slice() {
        let request = ExecutionRequest::new(&args.target, module, profile).with_options(options);
        let result = scheduler.run_cancellable(&request, &cancel).await;
        interrupt.abort();
        let result = result?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            render::print_result(&result);
        }
        if save {
            save_json(config, &args.target, &serde_json::to_value(&result)?)?;
        }
        Ok(())
    } else {
        let report = scheduler
            .run_batch_cancellable(&args.target, pairs, options, &cancel)
            .await;
        interrupt.abort();

        let json = report.to_json();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            render::print_report(&report);
        }
        if save {
            save_json(config, &args.target, &json)?;
        }
        if !report.is_empty() && report.succeeded().count() == 0 {
            Err(anyhow::anyhow!("all {} module runs failed", report.len()))
        } else {
            Ok(())
        }
    }
}

/// Split `--args` on whitespace. Quoting is not interpreted.
fn split_args(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Output file for one session: `<output_dir>/<target>_<timestamp>.json`.
fn output_path(dir: &Path, target: &str) -> PathBuf {
    let safe: String = target
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("{safe}_{stamp}.json"))
}

fn save_json(config: &Config, target: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    let dir = PathBuf::from(&config.global.output_dir);
    std::fs::create_dir_all(&dir)?;
    let path = output_path(&dir, target);
    std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
    eprintln!("Saved results to {}", path.display());
    Ok(())
}
