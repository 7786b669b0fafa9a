//! Aggregation over a breakdown event file: query timing percentiles,
//! workload composition, store growth between snapshots, and the most
//! frequent query/prompt patterns.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Preview length for pattern tables in the report.
const PATTERN_PREVIEW_CHARS: usize = 120;

/// How many patterns per table.
const TOP_PATTERNS: usize = 5;

/// One repeated query/prompt shape, grouped by content hash.
#[derive(Debug, Clone)]
pub struct PatternStat {
    pub hash: String,
    pub preview: String,
    pub count: usize,
    pub total_duration_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BreakdownMetrics {
    pub events: usize,

    pub prompt_calls: usize,
    pub avg_prompt_chars: f64,

    pub storage_queries: usize,
    pub indexing_queries: usize,
    pub search_queries: usize,
    pub write_queries: usize,
    pub read_queries: usize,
    pub query_p50_ms: f64,
    pub query_p95_ms: f64,
    pub avg_records_per_query: f64,
    pub avg_result_bytes_per_query: f64,

    pub node_delta: i64,
    pub relationship_delta: i64,
    pub node_property_chars_delta: i64,
    pub relationship_property_chars_delta: i64,
    pub index_online_after: i64,

    pub top_queries: Vec<PatternStat>,
    pub top_prompts: Vec<PatternStat>,
}

/// Linear-interpolation percentile over an unsorted sample.
/// `durations [10, 30]` gives p50 = 20.0 and p95 = 29.0.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = rank - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}

fn field_i64(event: &serde_json::Value, key: &str) -> i64 {
    event.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
}

fn field_f64(event: &serde_json::Value, key: &str) -> f64 {
    event.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

fn field_str<'a>(event: &'a serde_json::Value, key: &str) -> &'a str {
    event.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

struct PatternAccumulator {
    by_hash: HashMap<String, PatternStat>,
}

impl PatternAccumulator {
    fn new() -> Self {
        Self {
            by_hash: HashMap::new(),
        }
    }

    fn add(&mut self, hash: &str, preview: &str, duration_ms: f64) {
        if hash.is_empty() {
            return;
        }
        let stat = self
            .by_hash
            .entry(hash.to_string())
            .or_insert_with(|| PatternStat {
                hash: hash.to_string(),
                preview: preview.chars().take(PATTERN_PREVIEW_CHARS).collect(),
                count: 0,
                total_duration_ms: 0.0,
            });
        stat.count += 1;
        stat.total_duration_ms += duration_ms;
    }

    fn top(self) -> Vec<PatternStat> {
        let mut stats: Vec<PatternStat> = self.by_hash.into_values().collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then(a.hash.cmp(&b.hash)));
        stats.truncate(TOP_PATTERNS);
        stats
    }
}

/// Aggregate one breakdown JSONL file.
pub fn compute_breakdown_metrics(path: &Path) -> Result<BreakdownMetrics> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read breakdown file: {}", path.display()))?;

    let mut metrics = BreakdownMetrics::default();
    let mut query_durations = Vec::new();
    let mut total_records = 0i64;
    let mut total_result_bytes = 0i64;
    let mut total_prompt_chars = 0i64;
    let mut queries = PatternAccumulator::new();
    let mut prompts = PatternAccumulator::new();
    let mut snapshot_before: Option<serde_json::Value> = None;
    let mut snapshot_after: Option<serde_json::Value> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid breakdown event in {}", path.display()))?;
        metrics.events += 1;

        match field_str(&event, "op") {
            "chat_completion" => {
                metrics.prompt_calls += 1;
                total_prompt_chars += field_i64(&event, "prompt_size_chars");
                prompts.add(
                    field_str(&event, "prompt_hash"),
                    field_str(&event, "prompt_preview"),
                    field_f64(&event, "duration_ms"),
                );
            }
            "cypher_query" => {
                metrics.storage_queries += 1;
                match field_str(&event, "query_tag") {
                    "indexing" => metrics.indexing_queries += 1,
                    "search" => metrics.search_queries += 1,
                    "write" => metrics.write_queries += 1,
                    "read" => metrics.read_queries += 1,
                    _ => {}
                }
                query_durations.push(field_f64(&event, "duration_ms"));
                total_records += field_i64(&event, "records_count");
                total_result_bytes += field_i64(&event, "records_size_bytes");
                queries.add(
                    field_str(&event, "query_hash"),
                    field_str(&event, "query_preview"),
                    field_f64(&event, "duration_ms"),
                );
            }
            "db_snapshot" => match field_str(&event, "stage") {
                // First before and last after bracket the whole run.
                "before_collection" => {
                    if snapshot_before.is_none() {
                        snapshot_before = Some(event.clone());
                    }
                }
                "after_collection" => snapshot_after = Some(event.clone()),
                _ => {}
            },
            _ => {}
        }
    }

    if metrics.prompt_calls > 0 {
        metrics.avg_prompt_chars = total_prompt_chars as f64 / metrics.prompt_calls as f64;
    }
    if metrics.storage_queries > 0 {
        metrics.query_p50_ms = percentile(&query_durations, 50.0);
        metrics.query_p95_ms = percentile(&query_durations, 95.0);
        metrics.avg_records_per_query = total_records as f64 / metrics.storage_queries as f64;
        metrics.avg_result_bytes_per_query =
            total_result_bytes as f64 / metrics.storage_queries as f64;
    }

    if let (Some(before), Some(after)) = (&snapshot_before, &snapshot_after) {
        metrics.node_delta = field_i64(after, "node_count") - field_i64(before, "node_count");
        metrics.relationship_delta =
            field_i64(after, "relationship_count") - field_i64(before, "relationship_count");
        metrics.node_property_chars_delta =
            field_i64(after, "node_property_chars") - field_i64(before, "node_property_chars");
        metrics.relationship_property_chars_delta = field_i64(after, "relationship_property_chars")
            - field_i64(before, "relationship_property_chars");
    }
    if let Some(after) = &snapshot_after {
        metrics.index_online_after = field_i64(after, "online_indexes");
    }

    metrics.top_queries = queries.top();
    metrics.top_prompts = prompts.top();
    Ok(metrics)
}
