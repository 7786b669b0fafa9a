//! Drives the external token-matching analyzer over collected traces.
//!
//! The analyzer is a separate tool invoked per cell:
//! `{analyzer} -i <trace> -o <png> --log-matches <matches> --tokenizer <t>`.
//! Missing or empty traces are reported but not fatal; analyzer failures
//! and timeouts are.

use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use kvtrace_lib::config::{Config, ANALYSIS_TOKENIZER};
use kvtrace_lib::paths::{hit_rate_path, matches_path, result_dir, trace_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Ok,
    Missing,
    Empty,
    Error,
    Timeout,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Ok => "ok",
            AnalysisStatus::Missing => "missing",
            AnalysisStatus::Empty => "empty",
            AnalysisStatus::Error => "error",
            AnalysisStatus::Timeout => "timeout",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisStatus::Error | AnalysisStatus::Timeout)
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub dataset: String,
    pub scaffold: String,
    pub status: AnalysisStatus,
    pub detail: String,
}

/// Last non-empty stderr line, for one-line failure summaries.
fn stderr_tail(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

async fn analyze_cell(config: &Config, scaffold: &str, dataset: &str) -> AnalysisResult {
    let traces_dir = config.traces_dir.as_path();
    let trace_file = trace_path(traces_dir, scaffold, dataset);

    let done = |status: AnalysisStatus, detail: String| AnalysisResult {
        dataset: dataset.to_string(),
        scaffold: scaffold.to_string(),
        status,
        detail,
    };

    if !trace_file.exists() {
        println!("[{scaffold} x {dataset}] missing trace: {}", trace_file.display());
        return done(AnalysisStatus::Missing, String::new());
    }
    let line_count = match std::fs::read_to_string(&trace_file) {
        Ok(content) => content.lines().count(),
        Err(e) => {
            let detail = format!("failed to read trace file: {e}");
            println!("[{scaffold} x {dataset}] FAILED: {detail}");
            return done(AnalysisStatus::Error, detail);
        }
    };
    if line_count == 0 {
        println!("[{scaffold} x {dataset}] empty trace");
        return done(AnalysisStatus::Empty, String::new());
    }

    let out_dir = result_dir(traces_dir, scaffold, dataset);
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        let detail = format!("failed to create result directory: {e}");
        println!("[{scaffold} x {dataset}] FAILED: {detail}");
        return done(AnalysisStatus::Error, detail);
    }
    let output_png = hit_rate_path(traces_dir, scaffold, dataset);
    let match_jsonl = matches_path(traces_dir, scaffold, dataset);

    println!("[{scaffold} x {dataset}] analyzing ({line_count} entries)...");
    let mut command = Command::new(&config.analyzer_cmd);
    command
        .arg("-i")
        .arg(&trace_file)
        .arg("-o")
        .arg(&output_png)
        .arg("--log-matches")
        .arg(&match_jsonl)
        .arg("--tokenizer")
        .arg(ANALYSIS_TOKENIZER)
        .kill_on_drop(true);

    let timeout = Duration::from_secs(config.analyzer_timeout_secs);
    let output = match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => {
            warn!(scaffold, dataset, "Analyzer timed out");
            println!("[{scaffold} x {dataset}] timeout");
            return done(AnalysisStatus::Timeout, String::new());
        }
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            let detail = format!("failed to spawn {}: {e}", config.analyzer_cmd);
            warn!(scaffold, dataset, error = %e, "Analyzer spawn failed");
            println!("[{scaffold} x {dataset}] FAILED: {detail}");
            return done(AnalysisStatus::Error, detail);
        }
    };

    if output.status.success() {
        println!("[{scaffold} x {dataset}] OK -> {}", output_png.display());
        done(AnalysisStatus::Ok, String::new())
    } else {
        let tail = stderr_tail(&output.stderr);
        let detail = if tail.is_empty() {
            format!("exit={}", output.status.code().unwrap_or(-1))
        } else {
            tail
        };
        println!("[{scaffold} x {dataset}] FAILED: {detail}");
        done(AnalysisStatus::Error, detail)
    }
}

/// Analyze every requested cell, attempting all before reporting. Per-cell
/// failures (including spawn failures) land in the cell's result.
pub async fn run_analysis(
    config: &Config,
    datasets: &[String],
    scaffolds: &[String],
) -> Vec<AnalysisResult> {
    println!("=== Matrix Analysis ===");
    let mut results = Vec::new();
    for dataset in datasets {
        for scaffold in scaffolds {
            results.push(analyze_cell(config, scaffold, dataset).await);
        }
    }
    info!(cells = results.len(), "Analysis run complete");
    results
}

pub fn print_analysis_summary(results: &[AnalysisResult]) {
    println!("\n=== Analysis Summary ===");
    for r in results {
        println!("{:>14} | {:<11} | {}", r.dataset, r.scaffold, r.status.as_str());
    }
}

pub fn any_analysis_failed(results: &[AnalysisResult]) -> bool {
    results.iter().any(|r| r.status.is_fatal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn test_config(root: &std::path::Path) -> Config {
        let mut config = Config::from_env();
        config.traces_dir = root.to_path_buf();
        config
    }

    #[test]
    fn stderr_tail_takes_last_nonempty_line() {
        assert_eq!(stderr_tail(b"first\nsecond\n\n  \n"), "second");
        assert_eq!(stderr_tail(b""), "");
    }

    #[tokio::test]
    #[serial]
    async fn missing_and_empty_traces_are_nonfatal() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        let empty = trace_path(temp_dir.path(), "graphmem", "corpus50");
        std::fs::create_dir_all(empty.parent().unwrap()).unwrap();
        std::fs::write(&empty, "").unwrap();

        let results = run_analysis(
            &config,
            &["corpus50".to_string()],
            &["baseline".to_string(), "graphmem".to_string()],
        )
        .await;

        assert_eq!(results[0].status, AnalysisStatus::Missing);
        assert_eq!(results[1].status, AnalysisStatus::Empty);
        assert!(!any_analysis_failed(&results));
    }

    #[tokio::test]
    #[serial]
    async fn analyzer_failure_is_fatal_with_stderr_tail() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        // a command that exists everywhere and fails on our arguments
        config.analyzer_cmd = "false".to_string();

        let trace = trace_path(temp_dir.path(), "baseline", "corpus50");
        std::fs::create_dir_all(trace.parent().unwrap()).unwrap();
        std::fs::write(&trace, "{\"input\": \"x\"}\n").unwrap();

        let results = run_analysis(
            &config,
            &["corpus50".to_string()],
            &["baseline".to_string()],
        )
        .await;

        assert_eq!(results[0].status, AnalysisStatus::Error);
        assert!(results[0].detail.starts_with("exit="));
        assert!(any_analysis_failed(&results));
    }

    #[tokio::test]
    #[serial]
    async fn spawn_failure_is_a_cell_error_and_siblings_still_run() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        config.analyzer_cmd = temp_dir
            .path()
            .join("no-such-analyzer")
            .display()
            .to_string();

        for scaffold in ["baseline", "graphmem"] {
            let trace = trace_path(temp_dir.path(), scaffold, "corpus50");
            std::fs::create_dir_all(trace.parent().unwrap()).unwrap();
            std::fs::write(&trace, "{\"input\": \"x\"}\n").unwrap();
        }

        let results = run_analysis(
            &config,
            &["corpus50".to_string()],
            &["baseline".to_string(), "graphmem".to_string()],
        )
        .await;

        assert_eq!(results.len(), 2);
        for r in &results {
            assert_eq!(r.status, AnalysisStatus::Error);
            assert!(r.detail.contains("failed to spawn"));
        }
        assert!(any_analysis_failed(&results));
    }
}
