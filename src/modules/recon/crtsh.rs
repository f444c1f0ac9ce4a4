// src/modules/recon/crtsh.rs — Certificate Transparency subdomain discovery
//
// Queries crt.sh directly over HTTPS. The request future is dropped on
// timeout or cancellation, which aborts the connection.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::infra::errors::ReconError;
use crate::modules::profiles;
use crate::modules::target::validate_domain;
use crate::modules::types::*;

const NAME: &str = "crtsh";
const ENDPOINT: &str = "https://crt.sh/";

/// One row of crt.sh's JSON output (only the fields we use).
#[derive(Debug, Deserialize)]
struct CertEntry {
    #[serde(default)]
    name_value: String,
    #[serde(default)]
    not_before: Option<String>,
}

/// Query crt.sh for subdomains via Certificate Transparency logs.
pub struct CrtshModule {
    profiles: Vec<Profile>,
    client: reqwest::Client,
}

impl CrtshModule {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_profiles(profiles::with_overlay(NAME, default_profiles())?)
    }

    pub fn from_profiles(profiles: Vec<Profile>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("recon-progressive/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { profiles, client })
    }

    fn query_url(target: &str) -> Result<url::Url, ReconError> {
        url::Url::parse_with_params(
            ENDPOINT,
            &[("q", format!("%.{target}")), ("output", "json".into())],
        )
        .map_err(|e| ReconError::Other(e.into()))
    }
}

pub fn default_profiles() -> Vec<Profile> {
    vec![
        Profile::new("basic", &[], "Fetch unique subdomains from CT logs")
            .recommend("Default; fast and concise"),
        Profile::new(
            "verbose",
            &[],
            "Full certificate metadata + raw JSON preview",
        )
        .recommend("Debugging / manual inspection"),
    ]
}

#[async_trait]
impl ReconModule for CrtshModule {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Certificate Transparency subdomain discovery (crt.sh)"
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
        validate_domain(NAME, target)?;

        let url = Self::query_url(target)?;
        tracing::debug!(module = NAME, profile = %profile.name, "GET {}", url);

        let fail = |message: String| ReconError::execution(NAME, &profile.name, message);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| fail(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(fail(format!("crt.sh returned HTTP {status}")));
        }

        let verbose = profile.name == "verbose";
        let parsed = parse_response(&body, verbose).map_err(fail)?;
        let stdout = if verbose {
            body
        } else {
            subdomain_lines(&parsed)
        };

        Ok(ModuleOutput {
            stdout,
            stderr: String::new(),
            exit_code: None,
            parsed,
        })
    }
}

fn subdomain_lines(parsed: &serde_json::Value) -> String {
    parsed["subdomains"]
        .as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn parse_not_before(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse crt.sh JSON into sorted unique subdomains (plus first/last seen in
/// verbose mode). Returns an error message when the body is not JSON, which
/// is what crt.sh serves when it is overloaded.
pub fn parse_response(body: &str, verbose: bool) -> Result<serde_json::Value, String> {
    let entries: Vec<CertEntry> = serde_json::from_str(body)
        .map_err(|e| format!("invalid response from crt.sh (not JSON): {e}"))?;

    let mut subdomains = BTreeSet::new();
    let mut seen: Vec<DateTime<Utc>> = Vec::new();
    for entry in &entries {
        for name in entry.name_value.split('\n') {
            let name = name.trim();
            if !name.is_empty() {
                subdomains.insert(name.to_lowercase());
            }
        }
        if let Some(dt) = entry.not_before.as_deref().and_then(parse_not_before) {
            seen.push(dt);
        }
    }

    let mut parsed = json!({
        "subdomains": subdomains,
        "count": subdomains.len(),
    });
    if subdomains.is_empty() {
        parsed["note"] = json!("No certificates found");
    }
    if verbose {
        parsed["certificates"] = json!(entries.len());
        if let (Some(first), Some(last)) = (seen.iter().min(), seen.iter().max()) {
            parsed["first_seen"] = json!(first.to_rfc3339());
            parsed["last_seen"] = json!(last.to_rfc3339());
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"[
        {"name_value": "www.example.com\nexample.com", "not_before": "2023-01-10T00:00:00"},
        {"name_value": "API.example.com", "not_before": "2024-06-01T12:30:00"},
        {"name_value": "www.example.com", "not_before": "bogus"}
    ]"#;

    #[test]
    fn test_parse_basic() {
        let parsed = parse_response(BODY, false).unwrap();
        assert_eq!(
            parsed["subdomains"],
            json!(["api.example.com", "example.com", "www.example.com"])
        );
        assert_eq!(parsed["count"], 3);
        assert!(parsed.get("first_seen").is_none());
        assert_eq!(
            subdomain_lines(&parsed),
            "api.example.com\nexample.com\nwww.example.com"
        );
    }

    #[test]
    fn test_parse_verbose_dates() {
        let parsed = parse_response(BODY, true).unwrap();
        assert_eq!(parsed["certificates"], 3);
        assert_eq!(parsed["first_seen"], "2023-01-10T00:00:00+00:00");
        assert_eq!(parsed["last_seen"], "2024-06-01T12:30:00+00:00");
    }

    #[test]
    fn test_parse_empty_array() {
        let parsed = parse_response("[]", false).unwrap();
        assert_eq!(parsed["count"], 0);
        assert_eq!(parsed["note"], "No certificates found");
    }

    #[test]
    fn test_parse_html_error_page() {
        let err = parse_response("<html>502 Bad Gateway</html>", false).unwrap_err();
        assert!(err.contains("not JSON"));
    }

    #[test]
    fn test_query_url_encodes_wildcard() {
        let url = CrtshModule::query_url("example.com").unwrap();
        assert_eq!(url.as_str(), "https://crt.sh/?q=%25.example.com&output=json");
    }

    #[tokio::test]
    async fn test_rejects_ip_target() {
        let module = CrtshModule::from_profiles(default_profiles()).unwrap();
        let err = module
            .execute("10.0.0.1", "basic", &ExecuteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconError::InvalidTarget { .. }));
    }
}
