//! Markdown matrix report.
//!
//! The report is rebuilt from the on-disk files every time it is rendered;
//! nothing is cached from collection or analysis runs. Every
//! (dataset, scaffold) pair gets a status row even when nothing was
//! collected, so gaps in the matrix are visible.

use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

use crate::analysis::breakdown_metrics::{compute_breakdown_metrics, BreakdownMetrics};
use crate::analysis::rates::{compute_rates, AggregateRates};
use crate::collectors::{scaffold_description, SCAFFOLD_CHOICES};
use crate::config::{Config, ANALYSIS_TOKENIZER};
use crate::datasets::{dataset_description, DATASET_CHOICES};
use crate::paths::{breakdown_path, matches_path, trace_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    NotCollected,
    CollectedNotAnalyzed,
    Analyzed,
    Error,
}

impl CellStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellStatus::NotCollected => "not_collected",
            CellStatus::CollectedNotAnalyzed => "collected_not_analyzed",
            CellStatus::Analyzed => "analyzed",
            CellStatus::Error => "error",
        }
    }
}

struct CellRow {
    dataset: &'static str,
    scaffold: &'static str,
    status: CellStatus,
    rates: AggregateRates,
    breakdown: Option<BreakdownMetrics>,
}

/// A corrupt file degrades its cell to an `error` row instead of failing
/// the whole report; every pair keeps its row either way.
fn cell_row(traces_dir: &Path, scaffold: &'static str, dataset: &'static str) -> CellRow {
    let trace_file = trace_path(traces_dir, scaffold, dataset);
    let matches_file = matches_path(traces_dir, scaffold, dataset);
    let breakdown_file = breakdown_path(traces_dir, scaffold, dataset);

    let (status, rates) = if !trace_file.exists() {
        (CellStatus::NotCollected, AggregateRates::default())
    } else if !matches_file.exists() {
        (CellStatus::CollectedNotAnalyzed, AggregateRates::default())
    } else {
        match compute_rates(&matches_file) {
            Ok(rates) => (CellStatus::Analyzed, rates),
            Err(e) => {
                warn!(scaffold, dataset, error = %e, "Unreadable matches file");
                (CellStatus::Error, AggregateRates::default())
            }
        }
    };

    let breakdown = if breakdown_file.exists() {
        match compute_breakdown_metrics(&breakdown_file) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(scaffold, dataset, error = %e, "Unreadable breakdown file");
                None
            }
        }
    } else {
        None
    };

    CellRow {
        dataset,
        scaffold,
        status,
        rates,
        breakdown,
    }
}

fn pattern_table(out: &mut String, title: &str, stats: &[crate::analysis::PatternStat]) {
    if stats.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Hash | Count | Total ms | Preview |");
    let _ = writeln!(out, "|---|---:|---:|---|");
    for stat in stats {
        let preview = stat.preview.replace('|', "\\|").replace('\n', " ");
        let _ = writeln!(
            out,
            "| `{}` | {} | {:.1} | {} |",
            stat.hash, stat.count, stat.total_duration_ms, preview
        );
    }
    let _ = writeln!(out);
}

/// Render the full report from whatever is currently on disk.
pub fn render_matrix_report(config: &Config) -> Result<String> {
    let traces_dir = config.traces_dir.as_path();
    let mut rows = Vec::new();
    for dataset in DATASET_CHOICES {
        for scaffold in SCAFFOLD_CHOICES {
            rows.push(cell_row(traces_dir, scaffold, dataset));
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "# Matrix Breakdown Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Scope");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "- Datasets: {}",
        DATASET_CHOICES
            .iter()
            .map(|d| format!("`{d}`"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let _ = writeln!(
        out,
        "- Scaffolds: {}",
        SCAFFOLD_CHOICES
            .iter()
            .map(|s| format!("`{s}`"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "## Active Config");
    let _ = writeln!(out);
    let _ = writeln!(out, "- `LLM_API_BASE`: `{}`", config.llm_api_base);
    let _ = writeln!(out, "- `LLM_MODEL`: `{}`", config.llm_model);
    let _ = writeln!(out, "- `GRAPH_HTTP_URI`: `{}`", config.graph_http_uri);
    let _ = writeln!(out, "- `GRAPH_USERNAME`: `{}`", config.graph_username);
    let _ = writeln!(out, "- Tokenizer in analysis: `{ANALYSIS_TOKENIZER}`");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Dataset Notes");
    let _ = writeln!(out);
    for dataset in DATASET_CHOICES {
        let _ = writeln!(out, "- `{dataset}`: {}", dataset_description(dataset));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Scaffold Notes");
    let _ = writeln!(out);
    for scaffold in SCAFFOLD_CHOICES {
        let _ = writeln!(out, "- `{scaffold}`: {}", scaffold_description(scaffold));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Matrix Status");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "| Dataset | Scaffold | Status | Calls | Avg input tokens | Prefix | Substring | Gap |"
    );
    let _ = writeln!(out, "|---|---|---|---:|---:|---:|---:|---:|");
    for row in &rows {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {:.1} | {:.2}% | {:.2}% | {:.2}% |",
            row.dataset,
            row.scaffold,
            row.status.as_str(),
            row.rates.count,
            row.rates.avg_tokens,
            row.rates.prefix * 100.0,
            row.rates.substring * 100.0,
            row.rates.gap * 100.0,
        );
    }
    let _ = writeln!(out);

    let breakdown_rows: Vec<&CellRow> = rows.iter().filter(|r| r.breakdown.is_some()).collect();
    if !breakdown_rows.is_empty() {
        let _ = writeln!(out, "## Workload Breakdown");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "| Dataset | Scaffold | Events | Prompt calls | Storage queries | Search | p50 ms | p95 ms | Avg rec/query | Node Δ | Rel Δ | Online idx |"
        );
        let _ = writeln!(out, "|---|---|---:|---:|---:|---:|---:|---:|---:|---:|---:|---:|");
        for row in &breakdown_rows {
            let Some(m) = &row.breakdown else { continue };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {:.1} | {:.1} | {:.1} | {} | {} | {} |",
                row.dataset,
                row.scaffold,
                m.events,
                m.prompt_calls,
                m.storage_queries,
                m.search_queries,
                m.query_p50_ms,
                m.query_p95_ms,
                m.avg_records_per_query,
                m.node_delta,
                m.relationship_delta,
                m.index_online_after,
            );
        }
        let _ = writeln!(out);

        for row in &breakdown_rows {
            if let Some(metrics) = &row.breakdown {
                if metrics.top_queries.is_empty() && metrics.top_prompts.is_empty() {
                    continue;
                }
                let _ = writeln!(
                    out,
                    "### Patterns: {} x {}",
                    row.scaffold, row.dataset
                );
                let _ = writeln!(out);
                pattern_table(&mut out, "Top query patterns:", &metrics.top_queries);
                pattern_table(&mut out, "Top prompt patterns:", &metrics.top_prompts);
            }
        }
    }

    let _ = writeln!(out, "## Interpretation Hints");
    let _ = writeln!(out);
    let _ = writeln!(out, "- High prefix + small gap: prompt prefixes are stable.");
    let _ = writeln!(
        out,
        "- Low prefix + large gap: prompt blocks move, substring reuse dominates."
    );
    let _ = writeln!(out, "- Low both: low cross-call reuse in prompt content.");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn test_config(traces_dir: &Path) -> Config {
        let mut config = Config::from_env();
        config.traces_dir = traces_dir.to_path_buf();
        config
    }

    #[test]
    #[serial]
    fn every_pair_gets_a_status_row() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        let report = render_matrix_report(&config).unwrap();
        for dataset in DATASET_CHOICES {
            for scaffold in SCAFFOLD_CHOICES {
                assert!(
                    report.contains(&format!("| {dataset} | {scaffold} | not_collected |")),
                    "missing row for {scaffold} x {dataset}"
                );
            }
        }
        assert!(report.contains("# Matrix Breakdown Report"));
        assert!(report.contains("## Matrix Status"));
    }

    #[test]
    #[serial]
    fn statuses_track_on_disk_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        // collected but not analyzed
        let trace = trace_path(temp_dir.path(), "baseline", "corpus50");
        std::fs::create_dir_all(trace.parent().unwrap()).unwrap();
        std::fs::write(&trace, "{}\n").unwrap();

        // collected and analyzed
        let trace2 = trace_path(temp_dir.path(), "graphmem", "corpus50");
        std::fs::create_dir_all(trace2.parent().unwrap()).unwrap();
        std::fs::write(&trace2, "{}\n").unwrap();
        let matches = matches_path(temp_dir.path(), "graphmem", "corpus50");
        std::fs::create_dir_all(matches.parent().unwrap()).unwrap();
        std::fs::write(
            &matches,
            format!(
                "{}\n",
                serde_json::json!({
                    "InputLen": 10,
                    "Matches": [{"MatchStart": 0, "MatchEnd": 5}]
                })
            ),
        )
        .unwrap();

        let report = render_matrix_report(&config).unwrap();
        assert!(report.contains("| corpus50 | baseline | collected_not_analyzed |"));
        assert!(report.contains("| corpus50 | graphmem | analyzed | 1 | 10.0 | 50.00% | 50.00% | 0.00% |"));
    }

    #[test]
    #[serial]
    fn corrupt_cell_files_degrade_to_error_rows() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        let trace = trace_path(temp_dir.path(), "baseline", "corpus50");
        std::fs::create_dir_all(trace.parent().unwrap()).unwrap();
        std::fs::write(&trace, "{}\n").unwrap();
        let matches = matches_path(temp_dir.path(), "baseline", "corpus50");
        std::fs::create_dir_all(matches.parent().unwrap()).unwrap();
        std::fs::write(&matches, "not json at all\n").unwrap();
        let breakdown = breakdown_path(temp_dir.path(), "baseline", "corpus50");
        std::fs::write(&breakdown, "also not json\n").unwrap();

        let report = render_matrix_report(&config).unwrap();
        assert!(report.contains("| corpus50 | baseline | error |"));
        // every other pair still gets its row
        assert!(report.contains("| corpus50 | graphmem | not_collected |"));
    }
}
