// src/cli/render.rs — Terminal rendering of results

use crate::infra::errors::ReconError;
use crate::modules::ExecutionResult;
use crate::scheduler::BatchReport;

fn header(result: &ExecutionResult) -> String {
    let source = if result.from_cache {
        "cached".to_string()
    } else {
        format!("{}ms", result.elapsed_ms)
    };
    format!(
        "== {}:{} @ {} [{}, {}]",
        result.module,
        result.profile,
        result.target,
        source,
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Human-readable block for one result: header, raw output, parsed summary.
pub fn format_result(result: &ExecutionResult) -> String {
    let mut out = header(result);
    out.push('\n');

    let stdout = result.output.stdout.trim_end();
    if !stdout.is_empty() {
        out.push_str(stdout);
        out.push('\n');
    }
    if let Some(map) = result.output.parsed.as_object() {
        if !map.is_empty() {
            out.push_str("-- parsed\n");
            out.push_str(
                &serde_json::to_string_pretty(&result.output.parsed).unwrap_or_default(),
            );
            out.push('\n');
        }
    }
    out
}

pub fn format_failure(module: &str, profile: &str, error: &ReconError) -> String {
    format!("!! {module}:{profile} [{}] {error}", error.kind())
}

pub fn print_result(result: &ExecutionResult) {
    println!("{}", format_result(result));
}

/// Successes in submission order, then failures, then a one-line summary.
pub fn print_report(report: &BatchReport) {
    let mut outcomes: Vec<_> = report.outcomes.iter().collect();
    outcomes.sort_by_key(|o| o.index);

    for outcome in &outcomes {
        if let Ok(result) = &outcome.result {
            print_result(result);
        }
    }
    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            eprintln!("{}", format_failure(&outcome.module, &outcome.profile, e));
        }
    }
    eprintln!(
        "{} succeeded, {} failed in {:.1}s",
        report.succeeded().count(),
        report.failed().count(),
        report.elapsed.as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ModuleOutput;
    use chrono::TimeZone;

    fn result(from_cache: bool) -> ExecutionResult {
        ExecutionResult {
            module: "dig".into(),
            profile: "mx".into(),
            target: "example.com".into(),
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            elapsed_ms: 42,
            output: ModuleOutput {
                stdout: "10 mail.example.com.\n".into(),
                parsed: serde_json::json!({ "count": 1 }),
                ..Default::default()
            },
            from_cache,
        }
    }

    #[test]
    fn test_format_fresh_result() {
        let text = format_result(&result(false));
        assert!(text.starts_with("== dig:mx @ example.com [42ms, 2024-05-01 12:00:00 UTC]\n"));
        assert!(text.contains("10 mail.example.com.\n-- parsed\n"));
        assert!(text.contains("\"count\": 1"));
    }

    #[test]
    fn test_format_cached_result() {
        let text = format_result(&result(true));
        assert!(text.contains("[cached, "));
    }

    #[test]
    fn test_format_failure_shows_kind() {
        let err = ReconError::ModuleNotFound {
            name: "ghost".into(),
            suggestions: vec![],
        };
        assert_eq!(
            format_failure("ghost", "basic", &err),
            "!! ghost:basic [module_not_found] Module 'ghost' not found"
        );
    }
}
