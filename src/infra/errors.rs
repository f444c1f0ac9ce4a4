// src/infra/errors.rs — Error types for recon-progressive

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    // Lookup errors (surfaced to the caller)
    #[error("Module '{name}' not found{}", format_suggestions(.suggestions))]
    ModuleNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("Profile '{profile}' not found for module '{module}' (available: {})", .available.join(", "))]
    ProfileNotFound {
        module: String,
        profile: String,
        available: Vec<String>,
    },

    // Execution errors (reported per invocation, never fatal to a batch)
    #[error("Invalid target '{target}' for '{module}': {reason}")]
    InvalidTarget {
        module: String,
        target: String,
        reason: String,
    },

    #[error("Command not found: {tool} (required by '{module}')")]
    ToolMissing { module: String, tool: String },

    #[error("'{module}' ({profile}) failed: {message}")]
    Execution {
        module: String,
        profile: String,
        message: String,
    },

    #[error("'{module}' ({profile}) timed out after {}s", .after.as_secs_f64())]
    Timeout {
        module: String,
        profile: String,
        after: Duration,
    },

    #[error("'{module}' ({profile}) was cancelled")]
    Cancelled { module: String, profile: String },

    // Infra
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification used by batch reports and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ModuleNotFound,
    ProfileNotFound,
    Execution,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModuleNotFound => "module_not_found",
            Self::ProfileNotFound => "profile_not_found",
            Self::Execution => "execution",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ReconError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconError::ModuleNotFound { .. } => ErrorKind::ModuleNotFound,
            ReconError::ProfileNotFound { .. } => ErrorKind::ProfileNotFound,
            ReconError::InvalidTarget { .. }
            | ReconError::ToolMissing { .. }
            | ReconError::Execution { .. } => ErrorKind::Execution,
            ReconError::Timeout { .. } => ErrorKind::Timeout,
            ReconError::Cancelled { .. } => ErrorKind::Cancelled,
            ReconError::Cache(_)
            | ReconError::Config(_)
            | ReconError::Io(_)
            | ReconError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand used by module implementations.
    pub fn execution(
        module: impl Into<String>,
        profile: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ReconError::Execution {
            module: module.into(),
            profile: profile.into(),
            message: message.into(),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

/// Rank `candidates` by Jaro-Winkler similarity to `name`, keeping close ones.
pub fn suggest_names<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Vec<String> {
    let needle = name.to_lowercase();
    let mut scored: Vec<(&str, f64)> = candidates
        .map(|c| (c, strsim::jaro_winkler(&c.to_lowercase(), &needle)))
        .filter(|(_, score)| *score > 0.7)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(3);
    scored.into_iter().map(|(c, _)| c.to_string()).collect()
}
