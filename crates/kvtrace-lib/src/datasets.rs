//! Dataset loaders for the collection matrix.
//!
//! Every dataset resolves to a plain list of prompt strings in a
//! reproducible order. Load failures are per-dataset errors the matrix
//! runner can record without aborting the other datasets.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::config::Config;
use crate::corpus::TEST_CORPUS;
use crate::error::{TraceError, TraceResult};

pub const DATASET_CHOICES: [&str; 5] = [
    "corpus50",
    "bench_airline",
    "bench_retail",
    "bench_telecom",
    "legacy_replay",
];

/// One benchmark task as stored in `{tasks_dir}/{domain}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchTask {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_scenario: Option<String>,
    #[serde(default)]
    pub ticket: Option<String>,
}

/// Render a task to the sectioned prompt text collectors consume.
pub fn task_to_text(task: &BenchTask) -> String {
    let mut parts = vec![format!("[task_id]\n{}", task.id)];
    if let Some(description) = task.description.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("[description]\n{description}"));
    }
    if let Some(scenario) = task.user_scenario.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("[user_scenario]\n{scenario}"));
    }
    if let Some(ticket) = task.ticket.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("[ticket]\n{ticket}"));
    }
    parts.join("\n\n")
}

fn limit_rows(mut rows: Vec<String>, num_items: Option<usize>) -> Vec<String> {
    if let Some(n) = num_items {
        rows.truncate(n);
    }
    rows
}

fn load_bench_tasks(tasks_dir: &Path, domain: &str) -> TraceResult<Vec<String>> {
    let path = tasks_dir.join(format!("{domain}.json"));
    let raw = std::fs::read_to_string(&path).map_err(|e| TraceError::DatasetLoad {
        name: format!("bench_{domain}"),
        reason: format!("cannot read {}: {e}", path.display()),
    })?;
    let tasks: Vec<BenchTask> =
        serde_json::from_str(&raw).map_err(|e| TraceError::DatasetLoad {
            name: format!("bench_{domain}"),
            reason: format!("invalid task file {}: {e}", path.display()),
        })?;
    Ok(tasks.iter().map(task_to_text).collect())
}

/// Replay inputs from every `*.jsonl` file under `replay_dir`, sorted by
/// file name. Undecodable lines and records without an `input` field are
/// skipped; the files come from older collection runs and are not all
/// well formed.
fn load_legacy_replay(replay_dir: &Path) -> TraceResult<Vec<String>> {
    let entries = std::fs::read_dir(replay_dir).map_err(|e| TraceError::DatasetLoad {
        name: "legacy_replay".to_string(),
        reason: format!("cannot read {}: {e}", replay_dir.display()),
    })?;

    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();

    let mut rows = Vec::new();
    for path in files {
        let content = std::fs::read_to_string(&path).map_err(|e| TraceError::DatasetLoad {
            name: "legacy_replay".to_string(),
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(payload) = serde_json::from_str::<serde_json::Value>(line) else {
                debug!(file = %path.display(), "Skipping undecodable replay line");
                continue;
            };
            if let Some(input) = payload.get("input").and_then(|v| v.as_str()) {
                if !input.is_empty() {
                    rows.push(input.to_string());
                }
            }
        }
    }
    Ok(rows)
}

/// Load dataset rows as plain text prompts.
pub fn load_dataset(
    config: &Config,
    dataset: &str,
    num_items: Option<usize>,
) -> TraceResult<Vec<String>> {
    let rows = match dataset {
        "corpus50" => TEST_CORPUS.iter().map(|s| s.to_string()).collect(),
        "bench_airline" => load_bench_tasks(&config.tasks_dir, "airline")?,
        "bench_retail" => load_bench_tasks(&config.tasks_dir, "retail")?,
        "bench_telecom" => load_bench_tasks(&config.tasks_dir, "telecom")?,
        "legacy_replay" => load_legacy_replay(&config.replay_dir)?,
        other => return Err(TraceError::UnknownDataset(other.to_string())),
    };
    Ok(limit_rows(rows, num_items))
}

pub fn dataset_description(dataset: &str) -> &str {
    match dataset {
        "corpus50" => "Shared 50-item factual corpus embedded in the library",
        "bench_airline" => "Benchmark airline domain tasks (base split)",
        "bench_retail" => "Benchmark retail domain tasks (base split)",
        "bench_telecom" => "Benchmark telecom domain tasks (base split)",
        "legacy_replay" => "Replay inputs from earlier trace runs (replay dir, *.jsonl)",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn test_config(tasks_dir: &Path, replay_dir: &Path) -> Config {
        let mut config = Config::from_env();
        config.tasks_dir = tasks_dir.to_path_buf();
        config.replay_dir = replay_dir.to_path_buf();
        config
    }

    #[test]
    #[serial]
    fn corpus50_is_stable_and_limitable() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), temp_dir.path());

        let all = load_dataset(&config, "corpus50", None).unwrap();
        assert_eq!(all.len(), 50);
        let limited = load_dataset(&config, "corpus50", Some(3)).unwrap();
        assert_eq!(limited, all[..3].to_vec());
    }

    #[test]
    #[serial]
    fn unknown_dataset_is_a_typed_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), temp_dir.path());

        let err = load_dataset(&config, "nope", None).unwrap_err();
        assert!(matches!(err, TraceError::UnknownDataset(name) if name == "nope"));
    }

    #[test]
    #[serial]
    fn bench_tasks_render_sectioned_text() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("airline.json"),
            serde_json::json!([
                {"id": "t1", "description": "Book a flight", "user_scenario": "Traveler"},
                {"id": "t2", "ticket": "Refund request"}
            ])
            .to_string(),
        )
        .unwrap();
        let config = test_config(temp_dir.path(), temp_dir.path());

        let rows = load_dataset(&config, "bench_airline", None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            "[task_id]\nt1\n\n[description]\nBook a flight\n\n[user_scenario]\nTraveler"
        );
        assert_eq!(rows[1], "[task_id]\nt2\n\n[ticket]\nRefund request");
    }

    #[test]
    #[serial]
    fn missing_task_file_is_a_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), temp_dir.path());

        let err = load_dataset(&config, "bench_retail", None).unwrap_err();
        assert!(matches!(err, TraceError::DatasetLoad { name, .. } if name == "bench_retail"));
    }

    #[test]
    #[serial]
    fn legacy_replay_reads_sorted_files_and_skips_bad_lines() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("b_second.jsonl"),
            "{\"input\": \"from second\"}\n",
        )
        .unwrap();
        std::fs::write(
            temp_dir.path().join("a_first.jsonl"),
            "{\"input\": \"from first\"}\nnot json\n{\"output\": \"no input\"}\n{\"input\": \"\"}\n",
        )
        .unwrap();
        let config = test_config(temp_dir.path(), temp_dir.path());

        let rows = load_dataset(&config, "legacy_replay", None).unwrap();
        assert_eq!(rows, vec!["from first", "from second"]);
    }
}
