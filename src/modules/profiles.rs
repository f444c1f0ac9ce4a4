// src/modules/profiles.rs — Profile overlays
//
// Built-in modules ship hard-coded profiles. A YAML file at
// ~/.recon-progressive/profiles/<module>.yaml can replace individual profiles
// or add new ones:
//
//   profiles:
//     quick:
//       args: ["-p", "80,443"]
//       desc: "Web ports only"
//       recommendation: "Fast"
//       timeout_secs: 20

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::types::Profile;
use crate::infra::paths;

/// On-disk shape of one profile (YAML overlays and saved nmap profiles).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, alias = "description")]
    pub desc: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProfileSpec {
    pub fn into_profile(self, name: &str) -> Profile {
        Profile {
            name: name.to_string(),
            args: self.args,
            description: self.desc,
            recommendation: self.recommendation,
            timeout: self.timeout_secs.map(Duration::from_secs),
            cacheable: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OverlayFile {
    #[serde(default)]
    profiles: BTreeMap<String, ProfileSpec>,
}

/// Merge `overlay` into `defaults`: same-named profiles are replaced in place,
/// new ones are appended. A replaced profile keeps its cacheability.
pub fn merge(mut defaults: Vec<Profile>, overlay: BTreeMap<String, ProfileSpec>) -> Vec<Profile> {
    for (name, spec) in overlay {
        let mut profile = spec.into_profile(&name);
        match defaults.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                profile.cacheable = existing.cacheable;
                if profile.timeout.is_none() {
                    profile.timeout = existing.timeout;
                }
                *existing = profile;
            }
            None => defaults.push(profile),
        }
    }
    defaults
}

/// Read an overlay file. A missing file is not an error; a malformed one is.
pub fn load_overlay_from(path: &Path) -> anyhow::Result<BTreeMap<String, ProfileSpec>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let file: OverlayFile = serde_yml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid profile overlay {}: {}", path.display(), e))?;
    Ok(file.profiles)
}

/// Apply the user's overlay for `module` (if any) to its built-in profiles.
pub fn with_overlay(module: &str, defaults: Vec<Profile>) -> anyhow::Result<Vec<Profile>> {
    let path = paths::profiles_dir().join(format!("{module}.yaml"));
    let overlay = load_overlay_from(&path)?;
    if !overlay.is_empty() {
        tracing::debug!(
            "Applying {} profile override(s) to '{}' from {}",
            overlay.len(),
            module,
            path.display()
        );
    }
    Ok(merge(defaults, overlay))
}
