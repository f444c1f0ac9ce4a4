// src/modules/recon/dig.rs — DNS record enumeration

use async_trait::async_trait;
use serde_json::json;

use crate::infra::errors::ReconError;
use crate::modules::process;
use crate::modules::profiles;
use crate::modules::target::validate_target;
use crate::modules::types::*;

const NAME: &str = "dig";

/// DNS record enumeration using `dig +short`.
pub struct DigModule {
    profiles: Vec<Profile>,
}

impl DigModule {
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
        Profile::new("a", &["A"], "IPv4 addresses").recommend("Basic"),
        Profile::new("aaaa", &["AAAA"], "IPv6 addresses").recommend("IPv6"),
        Profile::new("mx", &["MX"], "Mail servers").recommend("Email"),
        Profile::new("ns", &["NS"], "Name servers").recommend("DNS infra"),
        Profile::new("txt", &["TXT"], "TXT records").recommend("Verification"),
        Profile::new("soa", &["SOA"], "Start of Authority").recommend("Zone info"),
        Profile::new("cname", &["CNAME"], "Canonical name").recommend("Aliases"),
        Profile::new("ptr", &["PTR"], "Reverse lookup").recommend("IP to domain"),
        Profile::new("any", &["ANY"], "All records").recommend("Full"),
    ]
}

#[async_trait]
impl ReconModule for DigModule {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "DNS record enumeration (A, MX, NS, TXT, ANY, etc.)"
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

        let mut args = vec![target.to_string()];
        args.extend(profile.args.iter().cloned());
        args.push("+short".into());

        let out = process::run_tool(NAME, &profile.name, "dig", &args)
            .await?
            .check_status(NAME, &profile.name)?;
        let parsed = parse_output(&out.stdout);
        Ok(out.into_output(parsed))
    }
}

/// Records are the non-empty, non-comment lines of `+short` output.
pub fn parse_output(stdout: &str) -> serde_json::Value {
    let records: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .collect();
    json!({
        "records": records,
        "count": records.len(),
    })
}
