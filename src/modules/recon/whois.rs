// src/modules/recon/whois.rs — WHOIS lookup

use async_trait::async_trait;
use serde_json::json;

use crate::infra::errors::ReconError;
use crate::modules::process;
use crate::modules::profiles;
use crate::modules::target::validate_target;
use crate::modules::types::*;

const NAME: &str = "whois";

/// Field name → accepted WHOIS labels, in priority order.
const FIELDS: &[(&str, &[&str])] = &[
    ("registrar", &["registrar", "sponsoring registrar"]),
    (
        "creation_date",
        &["creation date", "created on", "registered on"],
    ),
    (
        "expiry_date",
        &["registry expiry date", "expires on", "expiration date"],
    ),
    ("updated_date", &["updated date", "last updated on"]),
    ("registrant", &["registrant", "registrant name"]),
    ("admin", &["administrative contact", "admin email"]),
    ("tech", &["technical contact", "tech email"]),
];

const NAME_SERVER_LABELS: &[&str] = &["name server", "nameserver"];

/// Domain WHOIS lookup (registrar, dates, nameservers).
pub struct WhoisModule {
    profiles: Vec<Profile>,
}

impl WhoisModule {
    /// Built-in profiles merged with the user's overlay.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::from_profiles(profiles::with_overlay(
            NAME,
            default_profiles(),
        )?))
    }

    pub fn from_profiles(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }
}

pub fn default_profiles() -> Vec<Profile> {
    vec![
        Profile::new("basic", &[], "Standard WHOIS lookup").recommend("Default"),
        Profile::new("verbose", &["-H"], "Verbose WHOIS output (legal disclaimers hidden)")
            .recommend("Full details"),
    ]
}

#[async_trait]
impl ReconModule for WhoisModule {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Domain WHOIS lookup (registrar, dates, nameservers)"
    }

    fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    async fn execute(
        &self,
        target: &str,
        profile: &str,
        _options: &ExecuteOptions,
    ) -> Result<ModuleOutput, ReconError> {
        let profile = self.require_profile(profile)?;
        validate_target(NAME, target)?;

        let mut args = profile.args.clone();
        args.push(target.to_string());

        let out = process::run_tool(NAME, &profile.name, "whois", &args)
            .await?
            .check_status(NAME, &profile.name)?;
        let parsed = parse_output(&out.stdout);
        Ok(out.into_output(parsed))
    }
}

/// Split a `Label: value` line, returning the lowercased label.
fn split_field(line: &str) -> Option<(String, &str)> {
    let (label, value) = line.trim().split_once(':')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((label.trim().to_lowercase(), value))
}

/// Extract structured fields from WHOIS output.
pub fn parse_output(stdout: &str) -> serde_json::Value {
    let fields: Vec<(String, &str)> = stdout.lines().filter_map(split_field).collect();

    let first_match = |labels: &[&str]| -> Option<String> {
        labels.iter().find_map(|label| {
            fields
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, v)| v.to_string())
        })
    };

    let mut parsed = serde_json::Map::new();
    for (key, labels) in FIELDS {
        parsed.insert(key.to_string(), json!(first_match(labels)));
    }

    // All unique name servers, from the first label that has any
    let mut name_servers: Vec<String> = NAME_SERVER_LABELS
        .iter()
        .map(|label| {
            fields
                .iter()
                .filter(|(l, _)| l == label)
                .map(|(_, v)| v.to_lowercase())
                .collect::<Vec<_>>()
        })
        .find(|found| !found.is_empty())
        .unwrap_or_default();
    name_servers.sort();
    name_servers.dedup();
    parsed.insert("name_servers".into(), json!(name_servers));

    serde_json::Value::Object(parsed)
}
