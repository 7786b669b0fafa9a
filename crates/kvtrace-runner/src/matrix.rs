//! The (dataset x scaffold) collection matrix.
//!
//! Cells run sequentially. A dataset that fails to load marks every
//! scaffold cell for that dataset as an error without running any of them;
//! a collector failure is caught per cell. All cells are attempted before
//! the process decides its exit code.

use anyhow::Result;
use std::time::Instant;
use tracing::{error, info, warn};

use kvtrace_lib::collectors::{self, CollectRequest};
use kvtrace_lib::datasets::{dataset_description, load_dataset};
use kvtrace_lib::paths::{breakdown_path, matrix_key, trace_path};
use kvtrace_lib::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Ok,
    Skipped,
    Error,
}

impl CellStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellStatus::Ok => "OK",
            CellStatus::Skipped => "SKIPPED",
            CellStatus::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CellResult {
    pub dataset: String,
    pub scaffold: String,
    pub status: CellStatus,
    pub error: String,
    pub path: String,
    pub elapsed_secs: f64,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct MatrixOptions {
    pub datasets: Vec<String>,
    pub scaffolds: Vec<String>,
    pub num_items: Option<usize>,
    pub skip_existing: bool,
    pub with_breakdown: bool,
}

fn breakdown_context(
    run_id: &str,
    scaffold: &str,
    dataset: &str,
) -> serde_json::Map<String, serde_json::Value> {
    let key = matrix_key(scaffold, dataset);
    let mut context = serde_json::Map::new();
    context.insert("run_id".to_string(), format!("{run_id}:{key}").into());
    context.insert("dataset".to_string(), dataset.to_string().into());
    context.insert("scaffold".to_string(), scaffold.to_string().into());
    context.insert("matrix_key".to_string(), key.into());
    context
}

/// Run every requested cell. Always returns the full result list; the
/// caller inspects it for failures.
pub async fn run_matrix(config: &Config, options: &MatrixOptions) -> Result<Vec<CellResult>> {
    let run_id = format!("matrix_{}", chrono::Utc::now().timestamp());
    let mut results = Vec::new();

    println!("=== Trace Matrix Collection ===");
    println!("datasets:  {}", options.datasets.join(", "));
    println!("scaffolds: {}", options.scaffolds.join(", "));
    if let Some(n) = options.num_items {
        println!("num_items: {n}");
    }
    if options.with_breakdown {
        println!("workload_breakdown: enabled");
    }
    println!();

    for dataset in &options.datasets {
        let rows = match load_dataset(config, dataset, options.num_items) {
            Ok(rows) => rows,
            Err(e) => {
                error!(dataset, error = %e, "Dataset load failed");
                for scaffold in &options.scaffolds {
                    results.push(CellResult {
                        dataset: dataset.clone(),
                        scaffold: scaffold.clone(),
                        status: CellStatus::Error,
                        error: format!("dataset load failed: {e}"),
                        path: String::new(),
                        elapsed_secs: 0.0,
                        rows: 0,
                    });
                }
                continue;
            }
        };

        println!("[dataset] {dataset} ({} rows)", rows.len());
        println!("  - {}", dataset_description(dataset));

        for scaffold in &options.scaffolds {
            let output_path = trace_path(&config.traces_dir, scaffold, dataset);
            let cell_breakdown_path = options
                .with_breakdown
                .then(|| breakdown_path(&config.traces_dir, scaffold, dataset));

            if options.skip_existing && output_path.exists() {
                println!("  [{scaffold}] SKIP (exists): {}", output_path.display());
                results.push(CellResult {
                    dataset: dataset.clone(),
                    scaffold: scaffold.clone(),
                    status: CellStatus::Skipped,
                    error: String::new(),
                    path: output_path.display().to_string(),
                    elapsed_secs: 0.0,
                    rows: rows.len(),
                });
                continue;
            }

            println!("  [{scaffold}] running...");
            let request = CollectRequest {
                config,
                dataset,
                rows: &rows,
                trace_path: &output_path,
                breakdown_path: cell_breakdown_path.as_deref(),
                breakdown_context: breakdown_context(&run_id, scaffold, dataset),
            };
            let started = Instant::now();
            match collectors::collect(scaffold, request).await {
                Ok(path) => {
                    let elapsed = started.elapsed().as_secs_f64();
                    println!("  [{scaffold}] OK ({elapsed:.1}s) -> {}", path.display());
                    if let Some(bp) = &cell_breakdown_path {
                        println!("  [{scaffold}] breakdown -> {}", bp.display());
                    }
                    results.push(CellResult {
                        dataset: dataset.clone(),
                        scaffold: scaffold.clone(),
                        status: CellStatus::Ok,
                        error: String::new(),
                        path: path.display().to_string(),
                        elapsed_secs: elapsed,
                        rows: rows.len(),
                    });
                }
                Err(e) => {
                    let elapsed = started.elapsed().as_secs_f64();
                    warn!(scaffold, dataset, error = %e, "Cell failed");
                    println!("  [{scaffold}] FAILED ({elapsed:.1}s): {e}");
                    results.push(CellResult {
                        dataset: dataset.clone(),
                        scaffold: scaffold.clone(),
                        status: CellStatus::Error,
                        error: e.to_string(),
                        path: output_path.display().to_string(),
                        elapsed_secs: elapsed,
                        rows: rows.len(),
                    });
                }
            }
        }
        println!();
    }

    info!(cells = results.len(), "Matrix run complete");
    Ok(results)
}

pub fn print_matrix_summary(results: &[CellResult]) {
    println!("=== Matrix Summary ===");
    for r in results {
        match r.status {
            CellStatus::Ok => println!(
                "{:>14} | {:<11} | OK      | {:>4} rows | {:>6.1}s | {}",
                r.dataset, r.scaffold, r.rows, r.elapsed_secs, r.path
            ),
            CellStatus::Skipped => println!(
                "{:>14} | {:<11} | SKIPPED | {:>4} rows | {:>6} | {}",
                r.dataset, r.scaffold, r.rows, "-", r.path
            ),
            CellStatus::Error => println!(
                "{:>14} | {:<11} | ERROR   | {:>4} rows | {:>6.1}s | {}",
                r.dataset, r.scaffold, r.rows, r.elapsed_secs, r.error
            ),
        }
    }
}

pub fn any_cell_failed(results: &[CellResult]) -> bool {
    results.iter().any(|r| r.status == CellStatus::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn test_config(root: &std::path::Path) -> Config {
        let mut config = Config::from_env();
        config.traces_dir = root.join("traces");
        config.tasks_dir = root.join("tasks");
        config.replay_dir = root.join("replay");
        config
    }

    #[tokio::test]
    #[serial]
    async fn failing_dataset_marks_every_scaffold_cell() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        // tasks dir does not exist, so bench_airline cannot load
        let options = MatrixOptions {
            datasets: vec!["bench_airline".to_string()],
            scaffolds: vec!["baseline".to_string(), "graphmem".to_string()],
            num_items: None,
            skip_existing: false,
            with_breakdown: false,
        };

        let results = run_matrix(&config, &options).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == CellStatus::Error));
        assert!(results.iter().all(|r| r.error.contains("dataset load failed")));
        assert!(any_cell_failed(&results));
    }

    #[tokio::test]
    #[serial]
    async fn skip_existing_marks_cells_without_running() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        let existing = trace_path(&config.traces_dir, "baseline", "corpus50");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, "{}\n").unwrap();

        let options = MatrixOptions {
            datasets: vec!["corpus50".to_string()],
            scaffolds: vec!["baseline".to_string()],
            num_items: Some(1),
            skip_existing: true,
            with_breakdown: false,
        };

        let results = run_matrix(&config, &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CellStatus::Skipped);
        assert!(!any_cell_failed(&results));
        // the existing file is untouched
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "{}\n");
    }
}
