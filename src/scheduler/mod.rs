// src/scheduler/mod.rs — Execution scheduler
//
// Resolves a request against the registry, serves it from the cache when
// allowed, and otherwise runs the module under a timeout and a cancellation
// token. Both stop the module by dropping its future, which kills any
// child process it spawned.

pub mod batch;
pub mod types;

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheKey, ResultCache};
use crate::infra::errors::ReconError;
use crate::modules::{ExecuteOptions, ExecutionResult};
use crate::registry::Registry;

pub use batch::{BatchOutcome, BatchReport};
pub use types::{ExecutionRequest, ExecutionSettings, ModuleSelection, RunOptions};

/// Runs execution requests. Cheap to clone; clones share the registry,
/// cache and settings.
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<Registry>,
    cache: Arc<ResultCache>,
    settings: Arc<ExecutionSettings>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<Registry>,
        cache: Arc<ResultCache>,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            registry,
            cache,
            settings: Arc::new(settings),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Run one request to completion (or timeout).
    pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ReconError> {
        self.run_cancellable(request, &CancellationToken::new()).await
    }

    /// Run one request, abandoning it with `Cancelled` if `cancel` fires.
    pub async fn run_cancellable(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, ReconError> {
        let entry = self.registry.require(&request.module)?;
        let name = entry.name().to_string();
        let module = entry.module().clone();
        let profile = module.require_profile(&request.profile)?.clone();
        let cancelled = || ReconError::Cancelled {
            module: request.module.clone(),
            profile: profile.name.clone(),
        };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let key = CacheKey::for_profile(&request.target, &name, &profile, &request.options.args);
        let bypass = request
            .options
            .bypass_cache
            .unwrap_or(self.settings.bypass_cache);
        if bypass {
            tracing::debug!("Cache bypassed for {}", key);
        } else if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let timeout =
            self.settings
                .effective_timeout(request.options.timeout, &name, &profile);
        let options = ExecuteOptions {
            args: request.options.args.clone(),
            timeout,
        };

        tracing::info!(
            module = %name,
            profile = %profile.name,
            host = %request.target,
            "Running (timeout {}s)",
            timeout.as_secs_f64()
        );
        let timestamp = Utc::now();
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(cancelled()),
            finished = tokio::time::timeout(
                timeout,
                module.execute(&request.target, &profile.name, &options),
            ) => match finished {
                Ok(result) => result,
                Err(_) => Err(ReconError::Timeout {
                    module: request.module.clone(),
                    profile: profile.name.clone(),
                    after: timeout,
                }),
            },
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let output = match outcome {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("{} after {}ms", e, elapsed_ms);
                return Err(e);
            }
        };

        tracing::info!(
            module = %name,
            profile = %profile.name,
            elapsed_ms,
            "Completed"
        );
        let result = ExecutionResult {
            module: name,
            profile: profile.name.clone(),
            target: request.target.clone(),
            timestamp,
            elapsed_ms,
            output,
            from_cache: false,
        };

        if request.options.store && profile.cacheable {
            if let Err(e) = self.cache.put(&key, &result, self.settings.cache_ttl) {
                tracing::warn!("Failed to cache {}: {}", key, e);
            }
        }
        Ok(result)
    }
}
