// src/registry/mod.rs — Module registry
//
// Built once by `ModuleLoader::discover` and shared read-only (usually as
// `Arc<Registry>`) for the rest of the process. There is no mutation API
// after discovery.

pub mod catalog;
pub mod loader;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::infra::errors::{suggest_names, ReconError};
use crate::modules::ReconModule;

pub use catalog::{CandidateUnit, Constructor, UNCATEGORIZED};
pub use loader::{DiscoveryError, DiscoveryStage, ModuleLoader};

/// A module instance tagged with the category discovery assigned it.
#[derive(Clone)]
pub struct RegisteredModule {
    name: String,
    category: String,
    module: Arc<dyn ReconModule>,
}

impl RegisteredModule {
    /// The name the module is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn module(&self) -> &Arc<dyn ReconModule> {
        &self.module
    }
}

impl std::fmt::Debug for RegisteredModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredModule")
            .field("name", &self.name())
            .field("category", &self.category)
            .finish()
    }
}

/// Name → module and category → names, kept in step with each other.
#[derive(Debug, Default)]
pub struct Registry {
    modules: HashMap<String, RegisteredModule>,
    categories: BTreeMap<String, BTreeSet<String>>,
    diagnostics: Vec<DiscoveryError>,
}

impl Registry {
    /// An empty registry (for testing).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register under `name`. A later registration with the same name
    /// replaces the earlier one, in both indexes.
    fn insert(&mut self, name: String, category: &str, module: Arc<dyn ReconModule>) {
        if let Some(previous) = self.modules.remove(&name) {
            tracing::debug!(
                "Module '{}' re-registered; replacing the one from '{}'",
                name,
                previous.category
            );
            if let Some(names) = self.categories.get_mut(&previous.category) {
                names.remove(&name);
                if names.is_empty() {
                    self.categories.remove(&previous.category);
                }
            }
        }

        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(name.clone());
        self.modules.insert(
            name.clone(),
            RegisteredModule {
                name,
                category: category.to_string(),
                module,
            },
        );
    }

    fn record(&mut self, error: DiscoveryError) {
        tracing::warn!("Failed to load module {}", error);
        self.diagnostics.push(error);
    }

    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredModule> {
        self.modules.get(name)
    }

    /// Look up a module or fail with `ModuleNotFound` (with suggestions).
    pub fn require(&self, name: &str) -> Result<&RegisteredModule, ReconError> {
        self.get(name).ok_or_else(|| ReconError::ModuleNotFound {
            name: name.to_string(),
            suggestions: suggest_names(name, self.modules.keys().map(String::as_str)),
        })
    }

    /// Flat name → module mapping.
    pub fn list_all(&self) -> &HashMap<String, RegisteredModule> {
        &self.modules
    }

    /// Category → modules, both sorted by name.
    pub fn list_by_category(&self) -> BTreeMap<&str, Vec<&RegisteredModule>> {
        self.categories
            .iter()
            .map(|(category, names)| {
                let modules = names.iter().filter_map(|n| self.modules.get(n)).collect();
                (category.as_str(), modules)
            })
            .collect()
    }

    /// All module names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Candidates that failed to load during discovery.
    pub fn diagnostics(&self) -> &[DiscoveryError] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ExecuteOptions, ModuleOutput, Profile};
    use async_trait::async_trait;

    struct Named {
        name: &'static str,
        description: &'static str,
        profiles: Vec<Profile>,
    }

    #[async_trait]
    impl ReconModule for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.description
        }

        fn profiles(&self) -> &[Profile] {
            &self.profiles
        }

        async fn execute(
            &self,
            _target: &str,
            _profile: &str,
            _options: &ExecuteOptions,
        ) -> Result<ModuleOutput, ReconError> {
            Ok(ModuleOutput::default())
        }
    }

    fn named(name: &'static str, description: &'static str) -> Arc<dyn ReconModule> {
        Arc::new(Named {
            name,
            description,
            profiles: vec![Profile::new("basic", &[], "Basic")],
        })
    }

    /// Every module reachable by name is in exactly one category, and
    /// every name in the category index resolves.
    fn assert_cross_indexed(registry: &Registry) {
        let mut seen = 0;
        for (category, modules) in registry.list_by_category() {
            for m in modules {
                assert_eq!(registry.get(m.name()).unwrap().category(), category);
                seen += 1;
            }
        }
        assert_eq!(seen, registry.len());
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = Registry::empty();
        registry.insert("whois".into(), "recon", named("whois", "w"));
        registry.insert("nmap".into(), "scanning", named("nmap", "n"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("whois").unwrap().category(), "recon");
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["nmap", "whois"]);
        assert_cross_indexed(&registry);
    }

    #[test]
    fn test_last_registration_wins_across_categories() {
        let mut registry = Registry::empty();
        registry.insert("dup".into(), "recon", named("dup", "first"));
        registry.insert("dup".into(), "scanning", named("dup", "second"));

        assert_eq!(registry.len(), 1);
        let entry = registry.get("dup").unwrap();
        assert_eq!(entry.module().description(), "second");
        assert_eq!(entry.category(), "scanning");
        // The emptied category disappears from the index
        assert!(!registry.list_by_category().contains_key("recon"));
        assert_cross_indexed(&registry);
    }

    #[test]
    fn test_entry_reports_its_registered_name() {
        let mut registry = Registry::empty();
        registry.insert("spaced".into(), "recon", named(" spaced ", "s"));
        let entry = registry.require("spaced").unwrap();
        assert_eq!(entry.name(), "spaced");
        assert_eq!(
            format!("{entry:?}"),
            r#"RegisteredModule { name: "spaced", category: "recon" }"#
        );
    }

    #[test]
    fn test_require_suggests_close_names() {
        let mut registry = Registry::empty();
        registry.insert("whois".into(), "recon", named("whois", "w"));
        match registry.require("whoiss").unwrap_err() {
            ReconError::ModuleNotFound { name, suggestions } => {
                assert_eq!(name, "whoiss");
                assert_eq!(suggestions, vec!["whois"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
