// src/modules/scanning/nmap.rs — Nmap port scanner
//
// Built-in profiles, user-saved profiles from nmap_profiles.json, and a
// `custom` profile whose arguments come from the request.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::infra::errors::ReconError;
use crate::infra::paths;
use crate::modules::process;
use crate::modules::profiles::{self, ProfileSpec};
use crate::modules::target::validate_target;
use crate::modules::types::*;

const NAME: &str = "nmap";

/// Profile that takes its arguments from `ExecuteOptions::args`.
pub const CUSTOM_PROFILE: &str = "custom";

/// Timeout for user-saved and custom scans.
const USER_PROFILE_TIMEOUT: Duration = Duration::from_secs(300);

/// Nmap port scanner (active reconnaissance).
pub struct NmapModule {
    profiles: Vec<Profile>,
}

impl NmapModule {
    /// Built-ins, then the YAML overlay, then saved user profiles.
    pub fn new() -> anyhow::Result<Self> {
        let profiles = profiles::with_overlay(NAME, default_profiles())?;
        let user = load_user_profiles(&paths::nmap_profiles_path());
        Ok(Self::from_profiles(merge_user_profiles(profiles, user)))
    }

    pub fn from_profiles(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }

    /// Persist `args` as a named user profile. Takes effect on next start,
    /// since loaded modules are immutable.
    pub fn save_user_profile(path: &Path, name: &str, args: &[String]) -> anyhow::Result<()> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("profile name must not be empty");
        }
        if default_profiles().iter().any(|p| p.name == name) {
            anyhow::bail!("profile name '{name}' conflicts with a built-in profile");
        }
        if args.is_empty() {
            anyhow::bail!("refusing to save a profile without arguments");
        }

        let mut saved = load_user_profiles(path);
        saved.insert(
            name.to_string(),
            ProfileSpec {
                args: args.to_vec(),
                desc: format!("User-defined: {}", args.join(" ")),
                recommendation: "Custom profile".into(),
                timeout_secs: None,
            },
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&saved)?)?;
        tracing::info!("Saved nmap profile '{}' to {}", name, path.display());
        Ok(())
    }

    /// Arguments for one invocation: the profile's own, or the caller's for
    /// `custom`.
    fn scan_args(&self, profile: &Profile, options: &ExecuteOptions) -> Result<Vec<String>, ReconError> {
        if profile.name != CUSTOM_PROFILE {
            return Ok(profile.args.clone());
        }
        if options.args.is_empty() {
            return Err(ReconError::execution(
                NAME,
                CUSTOM_PROFILE,
                "custom profile requires scan arguments",
            ));
        }
        Ok(options.args.clone())
    }
}

pub fn default_profiles() -> Vec<Profile> {
    let secs = Duration::from_secs;
    vec![
        Profile::new("basic", &["-sS", "-p", "22,80,443", "-T4", "-v"], "Quick SYN scan of common ports")
            .recommend("Fast service discovery")
            .with_timeout(secs(30)),
        Profile::new("stealth", &["-sS", "-p", "1-1000", "-T4", "-v"], "Stealth scan of first 1000 ports")
            .recommend("Balance speed and coverage")
            .with_timeout(secs(30)),
        Profile::new("connect", &["-sT", "-p", "22,80,443", "-T4", "-v"], "TCP connect scan (no root needed)")
            .recommend("When root unavailable")
            .with_timeout(secs(30)),
        Profile::new("version", &["-sS", "-p-", "-sV", "-T4"], "Full port scan with version detection")
            .recommend("Detailed service enumeration")
            .with_timeout(secs(120)),
        Profile::new("os", &["-sS", "-p", "22,80,443", "-O", "-T4", "-v"], "Add OS detection to basic scan")
            .recommend("Identify target OS")
            .with_timeout(secs(30)),
        Profile::new("script", &["-sS", "-p", "22,80,443", "-sC", "-T4", "-v"], "Run default NSE scripts")
            .recommend("Additional info (banners, vulns)")
            .with_timeout(secs(30)),
        Profile::new("full", &["-sS", "-p-", "-sV", "-sC", "-O", "-T4"], "Comprehensive scan (all ports, versions, scripts, OS)")
            .recommend("Maximum data (slow)")
            .with_timeout(secs(180)),
        Profile::new(CUSTOM_PROFILE, &[], "Custom Nmap arguments supplied with the request")
            .recommend("Full flexibility")
            .with_timeout(USER_PROFILE_TIMEOUT),
    ]
}

/// Read saved user profiles. Unreadable or malformed files yield nothing.
pub fn load_user_profiles(path: &Path) -> BTreeMap<String, ProfileSpec> {
    let Ok(data) = std::fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    match serde_json::from_str::<BTreeMap<String, ProfileSpec>>(&data) {
        Ok(profiles) => profiles
            .into_iter()
            .filter(|(_, spec)| !spec.args.is_empty())
            .collect(),
        Err(e) => {
            tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

/// Append saved profiles; built-in names cannot be shadowed.
fn merge_user_profiles(mut profiles: Vec<Profile>, user: BTreeMap<String, ProfileSpec>) -> Vec<Profile> {
    for (name, spec) in user {
        if profiles.iter().any(|p| p.name == name) {
            tracing::warn!("Saved nmap profile '{}' shadows a built-in; skipped", name);
            continue;
        }
        let mut profile = spec.into_profile(&name);
        if profile.description.is_empty() {
            profile.description = format!("User-defined profile: {}", profile.args.join(" "));
        }
        if profile.recommendation.is_empty() {
            profile.recommendation = "Custom profile".into();
        }
        profile.timeout.get_or_insert(USER_PROFILE_TIMEOUT);
        profiles.push(profile);
    }
    profiles
}

#[async_trait]
impl ReconModule for NmapModule {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Nmap port scanner (active reconnaissance)"
    }

    fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    async fn execute(
        &self,
        target: &str,
        profile: &str,
        options: &ExecuteOptions,
    ) -> Result<ModuleOutput, ReconError> {
        let profile = self.require_profile(profile)?;
        validate_target(NAME, target)?;

        let mut args = self.scan_args(profile, options)?;
        args.push(target.to_string());

        let out = process::run_tool(NAME, &profile.name, "nmap", &args)
            .await?
            .check_status(NAME, &profile.name)?;
        let parsed = parse_output(&out.stdout);
        Ok(out.into_output(parsed))
    }
}

/// Parse `80/tcp open http Apache httpd 2.4.7` into a port record.
fn parse_port_line(line: &str) -> Option<serde_json::Value> {
    let mut parts = line.split_whitespace();
    let (port, proto) = parts.next()?.split_once('/')?;
    let port: u16 = port.parse().ok()?;
    if proto != "tcp" && proto != "udp" {
        return None;
    }
    let state = parts.next()?;
    let service = parts.next()?;
    let version = parts.collect::<Vec<_>>().join(" ");
    Some(json!({
        "port": port,
        "protocol": proto,
        "state": state,
        "service": service,
        "version": version,
    }))
}

/// Parse an NSE line such as `|_http-title: Example Domain`.
fn parse_script_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix('|')?;
    let rest = rest.strip_prefix('_').unwrap_or(rest).trim_start();
    let (name, value) = rest.split_once(':')?;
    let name = name.trim();
    let value = value.trim();
    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    (valid_name && !value.is_empty()).then(|| (name.to_lowercase(), value.to_string()))
}

/// Extract open ports, the OS guess, and NSE script results.
pub fn parse_output(stdout: &str) -> serde_json::Value {
    if stdout.trim().is_empty() {
        return json!({ "error": "No output produced." });
    }

    let mut open_ports = Vec::new();
    let mut os_guess: Option<String> = None;
    let mut scripts = serde_json::Map::new();

    for line in stdout.lines() {
        if let Some(port) = parse_port_line(line) {
            open_ports.push(port);
            continue;
        }
        if let Some((_, guess)) = line.split_once("Aggressive OS guesses:") {
            os_guess = Some(guess.trim().to_string());
            continue;
        }
        if let Some((name, value)) = parse_script_line(line) {
            scripts.insert(name, json!(value));
        }
    }

    let mut parsed = json!({
        "open_ports": open_ports,
        "os_guess": os_guess,
        "script_results": scripts,
    });
    if open_ports.is_empty() && os_guess.is_none() && scripts.is_empty() {
        parsed["warning"] = json!("No structured data could be parsed. Raw output provided.");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN: &str = "\
Starting Nmap 7.94 ( https://nmap.org )
Nmap scan report for example.com (93.184.216.34)
PORT    STATE  SERVICE  VERSION
22/tcp  open   ssh      OpenSSH 8.9p1 Ubuntu
80/tcp  open   http     Apache httpd 2.4.7
|_http-title: Example Domain
| ssl-cert: Subject: commonName=example.com
443/tcp closed https
Aggressive OS guesses: Linux 5.0 - 5.4 (95%), Linux 4.15 (90%)
";

    #[test]
    fn test_parse_ports_os_scripts() {
        let parsed = parse_output(SCAN);
        let ports = parsed["open_ports"].as_array().unwrap();
        assert_eq!(ports.len(), 3);
        assert_eq!(ports[0]["port"], 22);
        assert_eq!(ports[0]["version"], "OpenSSH 8.9p1 Ubuntu");
        assert_eq!(ports[1]["service"], "http");
        assert_eq!(ports[2]["state"], "closed");
        assert_eq!(ports[2]["version"], "");
        assert_eq!(parsed["os_guess"], "Linux 5.0 - 5.4 (95%), Linux 4.15 (90%)");
        assert_eq!(parsed["script_results"]["http-title"], "Example Domain");
        assert_eq!(
            parsed["script_results"]["ssl-cert"],
            "Subject: commonName=example.com"
        );
        assert!(parsed.get("warning").is_none());
    }

    #[test]
    fn test_parse_unstructured_output_warns() {
        let parsed = parse_output("Note: Host seems down.\n");
        assert!(parsed["warning"].is_string());
    }

    #[test]
    fn test_parse_empty_output() {
        assert_eq!(parse_output("")["error"], "No output produced.");
    }

    #[test]
    fn test_builtin_timeouts() {
        let module = NmapModule::from_profiles(default_profiles());
        let timeout = |name: &str| module.profile(name).unwrap().timeout;
        assert_eq!(timeout("basic"), Some(Duration::from_secs(30)));
        assert_eq!(timeout("version"), Some(Duration::from_secs(120)));
        assert_eq!(timeout("full"), Some(Duration::from_secs(180)));
        assert_eq!(timeout(CUSTOM_PROFILE), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_custom_requires_args() {
        let module = NmapModule::from_profiles(default_profiles());
        let custom = module.profile(CUSTOM_PROFILE).unwrap().clone();
        let err = module
            .scan_args(&custom, &ExecuteOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("requires scan arguments"));

        let options = ExecuteOptions {
            args: vec!["-p".into(), "1-100".into()],
            ..Default::default()
        };
        assert_eq!(module.scan_args(&custom, &options).unwrap(), vec!["-p", "1-100"]);
    }

    #[test]
    fn test_save_and_load_user_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nmap_profiles.json");

        NmapModule::save_user_profile(&path, "web", &["-p".into(), "80,443".into()]).unwrap();
        let saved = load_user_profiles(&path);
        assert_eq!(saved["web"].args, vec!["-p", "80,443"]);

        let merged = merge_user_profiles(default_profiles(), saved);
        let web = merged.iter().find(|p| p.name == "web").unwrap();
        assert_eq!(web.timeout, Some(USER_PROFILE_TIMEOUT));
        assert_eq!(web.recommendation, "Custom profile");
    }

    #[test]
    fn test_save_rejects_builtin_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nmap_profiles.json");
        let err = NmapModule::save_user_profile(&path, "basic", &["-F".into()]).unwrap_err();
        assert!(err.to_string().contains("built-in"));
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_user_profiles_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nmap_profiles.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load_user_profiles(&path).is_empty());
    }
}
