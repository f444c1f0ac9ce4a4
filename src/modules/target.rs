// src/modules/target.rs — Target validation shared by all modules
//
// Targets end up on external command lines, so anything that could be read
// as a flag or contains whitespace is rejected before a process is spawned.

use std::net::IpAddr;

use crate::infra::errors::ReconError;

/// Longest accepted hostname (RFC 1035 limit).
const MAX_TARGET_LEN: usize = 253;

/// Validate a domain, IP address, or CIDR range for `module`.
pub fn validate_target(module: &str, target: &str) -> Result<(), ReconError> {
    let reject = |reason: &str| ReconError::InvalidTarget {
        module: module.to_string(),
        target: target.to_string(),
        reason: reason.to_string(),
    };

    if target.is_empty() {
        return Err(reject("target is empty"));
    }
    if target.len() > MAX_TARGET_LEN {
        return Err(reject("target is too long"));
    }
    if target.starts_with('-') {
        return Err(reject("target must not start with '-'"));
    }
    if target.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if let Some(bad) = target
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '/')))
    {
        return Err(reject(&format!("unexpected character {bad:?}")));
    }
    // A single trailing dot marks a fully-qualified name
    let labels = target.strip_suffix('.').unwrap_or(target);
    if labels.split('.').any(str::is_empty) && !target.contains(':') {
        return Err(reject("empty hostname label"));
    }

    Ok(())
}

/// Validate a target that must be a hostname (no IPs, ranges or ports).
pub fn validate_domain(module: &str, target: &str) -> Result<(), ReconError> {
    validate_target(module, target)?;
    if target.parse::<IpAddr>().is_ok() || target.contains(['/', ':']) {
        return Err(ReconError::InvalidTarget {
            module: module.to_string(),
            target: target.to_string(),
            reason: "a domain name is required".into(),
        });
    }
    Ok(())
}
