// src/infra/paths.rs — Filesystem locations
//
// All paths respect the RECON_PROGRESSIVE_HOME environment variable for
// isolation. When it is set, config, cache and profile overlays live under
// that directory. When unset, everything lives under ~/.recon-progressive/.

use std::path::PathBuf;

/// Returns the RECON_PROGRESSIVE_HOME override, if set.
fn home_override() -> Option<PathBuf> {
    std::env::var_os("RECON_PROGRESSIVE_HOME").map(PathBuf::from)
}

/// Home directory. Falls back to the current directory when the platform
/// cannot report one (containers without $HOME).
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $RECON_PROGRESSIVE_HOME/ or ~/.recon-progressive/
pub fn config_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home;
    }
    dirs_home().join(".recon-progressive")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Result cache directory: ~/.recon-progressive/cache/
pub fn cache_dir() -> PathBuf {
    config_dir().join("cache")
}

/// Per-module YAML profile overlays: ~/.recon-progressive/profiles/<module>.yaml
pub fn profiles_dir() -> PathBuf {
    config_dir().join("profiles")
}

/// User-saved nmap profiles.
pub fn nmap_profiles_path() -> PathBuf {
    config_dir().join("nmap_profiles.json")
}

/// Ensure all required directories exist
pub async fn ensure_dirs() -> anyhow::Result<()> {
    let dirs = [config_dir(), cache_dir(), profiles_dir()];

    for dir in &dirs {
        tokio::fs::create_dir_all(dir).await?;
    }

    Ok(())
}
