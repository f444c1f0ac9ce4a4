// src/registry/loader.rs — Module discovery
//
// Walks the candidate catalogue once at startup. A unit that fails to load,
// a constructor that fails (or panics), or a module without a name is
// recorded as a diagnostic and skipped; discovery itself never fails.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::catalog::{builtin_units, CandidateUnit};
use super::Registry;
use crate::infra::config::Config;

/// Where in discovery a candidate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStage {
    Load,
    Instantiate,
    EmptyName,
}

impl DiscoveryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Instantiate => "instantiate",
            Self::EmptyName => "empty name",
        }
    }
}

/// A candidate that could not be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryError {
    pub path: String,
    pub stage: DiscoveryStage,
    pub message: String,
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.path,
            self.stage.as_str(),
            self.message
        )
    }
}

/// Builds a `Registry` from a set of candidate units.
pub struct ModuleLoader {
    units: Vec<CandidateUnit>,
    config: Config,
}

impl ModuleLoader {
    /// Loader over every module compiled into the binary.
    pub fn builtin() -> Self {
        Self::with_units(builtin_units())
    }

    pub fn with_units(units: Vec<CandidateUnit>) -> Self {
        Self {
            units,
            config: Config::default(),
        }
    }

    /// Skip modules disabled in `[modules.<name>]`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.config = config.clone();
        self
    }

    /// Run discovery and return the immutable snapshot.
    pub fn discover(self) -> Registry {
        let mut registry = Registry::empty();

        for unit in &self.units {
            if unit.is_package_marker() {
                tracing::debug!("Skipping package marker {}", unit.path);
                continue;
            }
            let category = unit.category();

            let constructors = match guarded(|| unit.load()) {
                Ok(c) => c,
                Err(message) => {
                    registry.record(DiscoveryError {
                        path: unit.path.clone(),
                        stage: DiscoveryStage::Load,
                        message,
                    });
                    continue;
                }
            };

            for constructor in &constructors {
                let module = match guarded(|| constructor()) {
                    Ok(m) => m,
                    Err(message) => {
                        registry.record(DiscoveryError {
                            path: unit.path.clone(),
                            stage: DiscoveryStage::Instantiate,
                            message,
                        });
                        continue;
                    }
                };

                let name = module.name().trim().to_string();
                if name.is_empty() {
                    registry.record(DiscoveryError {
                        path: unit.path.clone(),
                        stage: DiscoveryStage::EmptyName,
                        message: "module has no name".into(),
                    });
                    continue;
                }
                if !self.config.module_enabled(&name) {
                    tracing::info!("Module '{}' disabled by config", name);
                    continue;
                }

                registry.insert(name, &category, module.into());
            }
        }

        tracing::debug!(
            "Discovered {} module(s) in {} categories, {} warning(s)",
            registry.len(),
            registry.category_count(),
            registry.diagnostics().len()
        );
        registry
    }
}

/// Run a discovery step, turning both errors and panics into a message.
fn guarded<T>(step: impl FnOnce() -> anyhow::Result<T>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
