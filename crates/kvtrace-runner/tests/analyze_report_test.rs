//! Analyzer invocation and report writing against a stub analyzer binary.

use anyhow::Result;
use serial_test::serial;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

use kvtrace_lib::paths::{matches_path, trace_path};
use kvtrace_lib::Config;
use kvtrace_runner::analyze::{any_analysis_failed, run_analysis, AnalysisStatus};
use kvtrace_runner::{write_chart, write_report};

fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::from_env();
    config.traces_dir = root.join("traces");
    config
}

/// A stand-in analyzer: writes one match entry to the --log-matches path.
fn install_stub_analyzer(root: &std::path::Path) -> String {
    let script = root.join("stub-analyzer.sh");
    std::fs::write(
        &script,
        "#!/bin/sh\n\
         while [ $# -gt 0 ]; do\n\
           if [ \"$1\" = \"--log-matches\" ]; then out=\"$2\"; fi\n\
           shift\n\
         done\n\
         printf '%s\\n' '{\"InputLen\": 10, \"Matches\": [{\"MatchStart\": 0, \"MatchEnd\": 5}]}' > \"$out\"\n",
    )
    .unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
    script.display().to_string()
}

#[tokio::test]
#[serial]
async fn stub_analyzer_produces_matches_and_report_rows() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = test_config(temp_dir.path());
    config.analyzer_cmd = install_stub_analyzer(temp_dir.path());

    let trace = trace_path(&config.traces_dir, "baseline", "corpus50");
    std::fs::create_dir_all(trace.parent().unwrap())?;
    std::fs::write(&trace, "{\"input\": \"user: x\", \"output\": \"y\"}\n")?;

    let results = run_analysis(
        &config,
        &["corpus50".to_string()],
        &["baseline".to_string()],
    )
    .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, AnalysisStatus::Ok);
    assert!(!any_analysis_failed(&results));

    let matches = matches_path(&config.traces_dir, "baseline", "corpus50");
    assert!(matches.exists());

    let report_path = temp_dir.path().join("docs").join("matrix_breakdown.md");
    write_report(&config, &report_path)?;
    let report = std::fs::read_to_string(&report_path)?;
    assert!(report.contains("| corpus50 | baseline | analyzed | 1 | 10.0 | 50.00% | 50.00% | 0.00% |"));

    let chart_path = temp_dir.path().join("docs").join("comparison_chart.svg");
    write_chart(&config, &chart_path)?;
    let chart = std::fs::read_to_string(&chart_path)?;
    assert!(chart.starts_with("<svg"));
    assert!(chart.contains(">baseline</text>"));
    Ok(())
}

#[tokio::test]
#[serial]
async fn analyzer_timeout_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = test_config(temp_dir.path());
    let script = temp_dir.path().join("slow-analyzer.sh");
    std::fs::write(&script, "#!/bin/sh\nsleep 10\n")?;
    let mut perms = std::fs::metadata(&script)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms)?;
    config.analyzer_cmd = script.display().to_string();
    config.analyzer_timeout_secs = 1;

    let trace = trace_path(&config.traces_dir, "baseline", "corpus50");
    std::fs::create_dir_all(trace.parent().unwrap())?;
    std::fs::write(&trace, "{\"input\": \"user: x\"}\n")?;

    let results = run_analysis(
        &config,
        &["corpus50".to_string()],
        &["baseline".to_string()],
    )
    .await;
    assert_eq!(results[0].status, AnalysisStatus::Timeout);
    assert!(any_analysis_failed(&results));
    Ok(())
}
