// src/modules/types.rs — Module contract and the data it produces

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::infra::errors::ReconError;

/// A named execution variant of a module (e.g. a specific set of scan flags).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub args: Vec<String>,
    pub description: String,
    pub recommendation: String,
    /// Module-declared timeout, used when config has no override.
    pub timeout: Option<Duration>,
    /// Whether successful results of this profile may be cached.
    pub cacheable: bool,
}

impl Profile {
    pub fn new(name: impl Into<String>, args: &[&str], description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            description: description.into(),
            recommendation: String::new(),
            timeout: None,
            cacheable: true,
        }
    }

    /// Builder: set the recommendation line.
    pub fn recommend(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }

    /// Builder: set the declared timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder: never cache results of this profile.
    pub fn uncacheable(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

/// Identity of a module, as shown to the CLI and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
    pub profiles: Vec<String>,
}

/// Options handed to `ReconModule::execute` by the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Caller-supplied arguments for parameterised profiles (nmap `custom`).
    pub args: Vec<String>,
    /// Effective timeout the scheduler enforces around this call.
    pub timeout: Duration,
}

/// What a module produced for one invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; `None` for modules that do not spawn a process.
    pub exit_code: Option<i32>,
    /// Structured intelligence extracted from `stdout`.
    pub parsed: serde_json::Value,
}

/// A completed invocation, stamped with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub module: String,
    pub profile: String,
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub output: ModuleOutput,
    pub from_cache: bool,
}

/// The uniform contract every reconnaissance module implements.
///
/// Implementations are constructed once during discovery and never mutated
/// afterwards, so every method takes `&self`. `execute` may be called from
/// several tasks at once.
#[async_trait]
pub trait ReconModule: Send + Sync {
    /// Unique registry name.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Ordered set of supported profiles.
    fn profiles(&self) -> &[Profile];

    /// Run the module against `target` using the named profile.
    ///
    /// Must stop all underlying work when the returned future is dropped,
    /// which is how the scheduler enforces timeouts and cancellation.
    async fn execute(
        &self,
        target: &str,
        profile: &str,
        options: &ExecuteOptions,
    ) -> Result<ModuleOutput, ReconError>;

    fn identity(&self) -> ModuleInfo {
        ModuleInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            profiles: self.profiles().iter().map(|p| p.name.clone()).collect(),
        }
    }

    fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles().iter().find(|p| p.name == name)
    }

    /// Look up a profile or fail with `ProfileNotFound`.
    fn require_profile(&self, name: &str) -> Result<&Profile, ReconError> {
        self.profile(name).ok_or_else(|| ReconError::ProfileNotFound {
            module: self.name().to_string(),
            profile: name.to_string(),
            available: self.profiles().iter().map(|p| p.name.clone()).collect(),
        })
    }
}
