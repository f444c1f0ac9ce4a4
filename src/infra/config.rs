// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,

    /// Per-module overrides, keyed by module name.
    #[serde(default)]
    pub modules: HashMap<String, ModuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    /// Bypass the cache unless a run says otherwise.
    pub no_cache: bool,
    pub output_dir: String,
    pub save_output: bool,
    /// Upper bound on concurrently running batch members (0 = unbounded).
    pub max_parallel: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            cache_ttl_secs: 3600,
            no_cache: false,
            output_dir: "recon-output".into(),
            save_output: false,
            max_parallel: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub profile_timeouts: HashMap<String, u64>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: None,
            profile_timeouts: HashMap::new(),
        }
    }
}

impl ModuleConfig {
    /// Configured timeout for `profile`, falling back to the module-wide one.
    pub fn timeout_for(&self, profile: &str) -> Option<Duration> {
        self.profile_timeouts
            .get(profile)
            .copied()
            .or(self.timeout_secs)
            .map(Duration::from_secs)
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.global.cache_ttl_secs)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.global.timeout_secs)
    }

    /// Whether a module may be registered at discovery time.
    pub fn module_enabled(&self, name: &str) -> bool {
        self.modules.get(name).map_or(true, |m| m.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.global.timeout_secs, 30);
        assert_eq!(c.global.cache_ttl_secs, 3600);
        assert!(!c.global.no_cache);
        assert_eq!(c.global.output_dir, "recon-output");
        assert!(!c.global.save_output);
        assert_eq!(c.global.max_parallel, 0);
        assert!(c.modules.is_empty());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.global.timeout_secs, 30);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_partial_global() {
        let toml_str = r#"
[global]
cache_ttl_secs = 60
no_cache = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.global.cache_ttl_secs, 60);
        assert!(config.global.no_cache);
        // Untouched keys keep their defaults
        assert_eq!(config.global.timeout_secs, 30);
        assert_eq!(config.global.output_dir, "recon-output");
    }

    #[test]
    fn test_parse_module_overrides() {
        let toml_str = r#"
[modules.nmap]
timeout_secs = 600

[modules.nmap.profile_timeouts]
full = 900

[modules.crtsh]
enabled = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let nmap = &config.modules["nmap"];
        assert_eq!(nmap.timeout_for("full"), Some(Duration::from_secs(900)));
        assert_eq!(nmap.timeout_for("basic"), Some(Duration::from_secs(600)));
        assert_eq!(config.modules["crtsh"].timeout_for("basic"), None);
        assert!(config.module_enabled("nmap"));
        assert!(!config.module_enabled("crtsh"));
        assert!(config.module_enabled("unknown"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            deserialized.global.cache_ttl_secs,
            config.global.cache_ttl_secs
        );
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }
}
