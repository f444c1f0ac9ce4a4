// src/scheduler/types.rs — Requests and execution settings

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::infra::config::{Config, ModuleConfig};
use crate::modules::Profile;
use crate::registry::Registry;

/// Profile used when a selection names none and the module has it.
pub const DEFAULT_PROFILE: &str = "basic";

/// Scheduler-wide settings, resolved once from `Config`.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub default_timeout: Duration,
    pub cache_ttl: Duration,
    /// Skip cache reads unless a request says otherwise.
    pub bypass_cache: bool,
    /// Concurrent batch members allowed at once (0 = unbounded).
    pub max_parallel: usize,
    pub module_overrides: HashMap<String, ModuleConfig>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExecutionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_timeout: config.default_timeout(),
            cache_ttl: config.cache_ttl(),
            bypass_cache: config.global.no_cache,
            max_parallel: config.global.max_parallel,
            module_overrides: config.modules.clone(),
        }
    }

    /// Timeout for one invocation. Most specific wins: the request, then
    /// the configured profile and module overrides, then the profile's own
    /// declared timeout, then the global default.
    pub fn effective_timeout(
        &self,
        requested: Option<Duration>,
        module: &str,
        profile: &Profile,
    ) -> Duration {
        requested
            .or_else(|| {
                self.module_overrides
                    .get(module)
                    .and_then(|m| m.timeout_for(&profile.name))
            })
            .or(profile.timeout)
            .unwrap_or(self.default_timeout)
    }
}

/// Per-request knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// `Some(true)` forces a fresh run; `None` follows the settings.
    pub bypass_cache: Option<bool>,
    /// Write a successful fresh result back to the cache.
    pub store: bool,
    pub timeout: Option<Duration>,
    /// Extra arguments for parameterised profiles.
    pub args: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            bypass_cache: None,
            store: true,
            timeout: None,
            args: Vec::new(),
        }
    }
}

/// One (target, module, profile) invocation.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub target: String,
    pub module: String,
    pub profile: String,
    pub options: RunOptions,
}

impl ExecutionRequest {
    pub fn new(
        target: impl Into<String>,
        module: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            module: module.into(),
            profile: profile.into(),
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.options.bypass_cache = Some(bypass);
        self
    }

    /// Do not write the result back to the cache.
    pub fn no_store(mut self) -> Self {
        self.options.store = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.options.args = args;
        self
    }
}

/// A `module[:profile]` selection as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSelection {
    pub module: String,
    pub profile: Option<String>,
}

impl FromStr for ModuleSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, profile) = match s.split_once(':') {
            Some((m, p)) => (m.trim(), Some(p.trim())),
            None => (s.trim(), None),
        };
        if module.is_empty() {
            return Err(format!("invalid module selection '{s}': empty module name"));
        }
        if profile.is_some_and(str::is_empty) {
            return Err(format!("invalid module selection '{s}': empty profile name"));
        }
        Ok(Self {
            module: module.to_string(),
            profile: profile.map(String::from),
        })
    }
}

impl ModuleSelection {
    /// Fill in the profile when none was given: `basic` if the module has
    /// it, otherwise its first profile. Unknown modules keep `basic` and
    /// fail later with `ModuleNotFound`.
    pub fn resolve(&self, registry: &Registry) -> (String, String) {
        let profile = self.profile.clone().unwrap_or_else(|| {
            registry
                .get(&self.module)
                .and_then(|entry| {
                    let module = entry.module();
                    module
                        .profile(DEFAULT_PROFILE)
                        .or_else(|| module.profiles().first())
                        .map(|p| p.name.clone())
                })
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
        });
        (self.module.clone(), profile)
    }
}
