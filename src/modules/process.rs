// src/modules/process.rs — External tool invocation
//
// Every module that shells out goes through `run_tool`. The child is spawned
// with kill_on_drop, so dropping the future (timeout, batch cancellation)
// terminates the process instead of leaving it running detached.

use std::process::Stdio;

use tokio::process::Command;

use super::types::ModuleOutput;
use crate::infra::errors::ReconError;

/// Raw result of one external command.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl ToolOutput {
    /// Fail with `Execution` on a non-zero exit, carrying trimmed stderr.
    pub fn check_status(self, module: &str, profile: &str) -> Result<Self, ReconError> {
        if self.success {
            return Ok(self);
        }
        let detail = match self.stderr.trim() {
            "" => "no stderr output".to_string(),
            s => s.to_string(),
        };
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".into());
        Err(ReconError::execution(
            module,
            profile,
            format!("exited with {code}: {detail}"),
        ))
    }

    /// Attach parsed intelligence and convert into module output.
    pub fn into_output(self, parsed: serde_json::Value) -> ModuleOutput {
        ModuleOutput {
            stdout: self.stdout,
            stderr: self.stderr,
            exit_code: self.exit_code,
            parsed,
        }
    }
}

/// Run `program` with `args` on behalf of `module`/`profile`.
///
/// The program is resolved on PATH first; a missing binary is reported as
/// `ToolMissing` rather than a generic I/O failure.
pub async fn run_tool(
    module: &str,
    profile: &str,
    program: &str,
    args: &[String],
) -> Result<ToolOutput, ReconError> {
    let path = which::which(program).map_err(|_| ReconError::ToolMissing {
        module: module.to_string(),
        tool: program.to_string(),
    })?;

    tracing::debug!(module, profile, "Running: {} {}", program, args.join(" "));

    let output = Command::new(&path)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ReconError::execution(module, profile, format!("failed to run {program}: {e}")))?;

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        success: output.status.success(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool() {
        let err = run_tool("m", "p", "definitely-not-a-real-binary-xyz", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ReconError::ToolMissing { ref tool, .. } if tool == "definitely-not-a-real-binary-xyz"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout() {
        let out = run_tool("m", "p", "sh", &["-c".into(), "echo hello".into()])
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_execution_error() {
        let out = run_tool(
            "m",
            "p",
            "sh",
            &["-c".into(), "echo boom >&2; exit 3".into()],
        )
        .await
        .unwrap();
        assert!(!out.success);
        let err = out.check_status("m", "p").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exited with 3"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_future_returns_promptly() {
        let started = std::time::Instant::now();
        let res = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            run_tool("m", "p", "sleep", &["30".into()]),
        )
        .await;
        assert!(res.is_err());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
