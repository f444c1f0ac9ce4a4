// src/scheduler/batch.rs — Concurrent batches against one target

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ExecutionRequest, RunOptions, Scheduler};
use crate::infra::errors::{ErrorKind, ReconError};
use crate::modules::ExecutionResult;
use crate::registry::loader::panic_message;

/// Outcome of one batch member, tagged with its submission index.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub module: String,
    pub profile: String,
    pub result: Result<ExecutionResult, ReconError>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(ReconError::kind)
    }
}

/// Every submitted pair appears exactly once, in completion order.
#[derive(Debug)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub target: String,
    pub outcomes: Vec<BatchOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Outcomes in submission order.
    pub fn sorted(mut self) -> Self {
        self.outcomes.sort_by_key(|o| o.index);
        self
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// JSON view for `--json` and saved sessions.
    pub fn to_json(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct Failure<'a> {
            index: usize,
            module: &'a str,
            profile: &'a str,
            kind: &'static str,
            error: String,
        }

        let failures: Vec<Failure<'_>> = self
            .outcomes
            .iter()
            .filter_map(|o| {
                let e = o.result.as_ref().err()?;
                Some(Failure {
                    index: o.index,
                    module: &o.module,
                    profile: &o.profile,
                    kind: e.kind().as_str(),
                    error: e.to_string(),
                })
            })
            .collect();

        serde_json::json!({
            "batch_id": self.batch_id.to_string(),
            "target": self.target,
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "results": self.succeeded().collect::<Vec<_>>(),
            "failures": failures,
        })
    }
}

impl Scheduler {
    /// Run every (module, profile) pair against `target` concurrently and
    /// wait for all of them.
    pub async fn run_batch(
        &self,
        target: &str,
        pairs: Vec<(String, String)>,
        options: RunOptions,
    ) -> BatchReport {
        self.run_batch_cancellable(target, pairs, options, &CancellationToken::new())
            .await
    }

    /// Like `run_batch`, but members still running when `cancel` fires
    /// report `Cancelled`. Finished members keep their results.
    pub async fn run_batch_cancellable(
        &self,
        target: &str,
        pairs: Vec<(String, String)>,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let limiter = match self.settings.max_parallel {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };
        tracing::info!(
            batch = %batch_id,
            host = %target,
            "Starting batch of {} member(s)",
            pairs.len()
        );

        // Dropping the set aborts whatever is still running
        let mut tasks = JoinSet::new();
        for (index, (module, profile)) in pairs.iter().cloned().enumerate() {
            let scheduler = self.clone();
            let token = cancel.child_token();
            let limiter = limiter.clone();
            let request = ExecutionRequest::new(target, module, profile)
                .with_options(options.clone());

            tasks.spawn(async move {
                let result = scheduler.run_member(&request, &token, limiter).await;
                (index, result)
            });
        }

        let mut outcomes = Vec::with_capacity(pairs.len());
        let mut reported = vec![false; pairs.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    reported[index] = true;
                    let (module, profile) = &pairs[index];
                    outcomes.push(BatchOutcome {
                        index,
                        module: module.clone(),
                        profile: profile.clone(),
                        result,
                    });
                }
                Err(e) => tracing::warn!("Batch {} member task failed: {}", batch_id, e),
            }
        }

        // A member whose task died without reporting still gets an outcome
        for (index, (module, profile)) in pairs.iter().enumerate() {
            if !reported[index] {
                outcomes.push(BatchOutcome {
                    index,
                    module: module.clone(),
                    profile: profile.clone(),
                    result: Err(ReconError::Other(anyhow::anyhow!(
                        "batch member {module}:{profile} did not report a result"
                    ))),
                });
            }
        }

        let report = BatchReport {
            batch_id,
            target: target.to_string(),
            outcomes,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            batch = %batch_id,
            "Batch finished: {} ok, {} failed in {:?}",
            report.succeeded().count(),
            report.failed().count(),
            report.elapsed
        );
        report
    }

    async fn run_member(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
        limiter: Option<Arc<Semaphore>>,
    ) -> Result<ExecutionResult, ReconError> {
        let _permit = match limiter {
            Some(limiter) => tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ReconError::Cancelled {
                        module: request.module.clone(),
                        profile: request.profile.clone(),
                    });
                }
                permit = limiter.acquire_owned() => permit.ok(),
            },
            None => None,
        };

        match AssertUnwindSafe(self.run_cancellable(request, cancel))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(ReconError::Other(anyhow::anyhow!(
                "module '{}' panicked: {}",
                request.module,
                panic_message(panic.as_ref())
            ))),
        }
    }
}
