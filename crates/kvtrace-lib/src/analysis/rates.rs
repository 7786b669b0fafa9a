//! Pooled match-rate aggregation over an analyzer match file.
//!
//! Rates are pooled over all entries (total matched tokens over total input
//! tokens), not averaged per entry, so long prompts weigh proportionally.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One token span reported by the analyzer. Field names follow the
/// analyzer's match-file format.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchSpan {
    #[serde(rename = "MatchStart")]
    pub start: i64,
    #[serde(rename = "MatchEnd")]
    pub end: i64,
}

/// One analyzed trace record.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchEntry {
    #[serde(rename = "InputLen", default)]
    pub input_len: i64,
    #[serde(rename = "Matches", default)]
    pub matches: Vec<MatchSpan>,
}

/// Pooled rates for one match file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateRates {
    pub count: usize,
    pub avg_tokens: f64,
    /// Fraction of input tokens covered by the contiguous run anchored at 0.
    pub prefix: f64,
    /// Fraction of input tokens covered by any match span.
    pub substring: f64,
    /// `substring - prefix`; reuse that a prefix cache cannot capture.
    pub gap: f64,
}

/// Tokens covered by the union of clipped spans.
fn substring_tokens(input_len: i64, spans: &[(i64, i64)]) -> i64 {
    let mut sorted: Vec<(i64, i64)> = spans
        .iter()
        .map(|&(start, end)| (start.max(0), end.min(input_len)))
        .filter(|&(start, end)| end > start)
        .collect();
    sorted.sort();

    let mut covered = 0;
    let mut cursor = 0i64;
    for (start, end) in sorted {
        let from = start.max(cursor);
        if end > from {
            covered += end - from;
            cursor = end;
        }
        cursor = cursor.max(end);
    }
    covered
}

/// Length of the greedy contiguous run anchored at token 0: a span whose
/// start is at or inside the covered boundary extends it, the first span
/// past the boundary ends the run.
fn prefix_tokens(input_len: i64, spans: &[(i64, i64)]) -> i64 {
    let mut sorted: Vec<(i64, i64)> = spans
        .iter()
        .map(|&(start, end)| (start.max(0), end.min(input_len)))
        .collect();
    sorted.sort();

    let mut prefix_end = 0i64;
    for (start, end) in sorted {
        if start <= prefix_end {
            prefix_end = prefix_end.max(end);
        } else {
            break;
        }
    }
    prefix_end
}

/// Aggregate one JSONL match file.
pub fn compute_rates(path: &Path) -> Result<AggregateRates> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read match file: {}", path.display()))?;

    let mut count = 0usize;
    let mut total_input_tokens = 0i64;
    let mut total_prefix = 0i64;
    let mut total_substring = 0i64;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: MatchEntry = serde_json::from_str(line)
            .with_context(|| format!("Invalid match entry in {}", path.display()))?;
        count += 1;
        total_input_tokens += entry.input_len;
        if entry.input_len == 0 || entry.matches.is_empty() {
            continue;
        }
        let spans: Vec<(i64, i64)> = entry.matches.iter().map(|m| (m.start, m.end)).collect();
        total_substring += substring_tokens(entry.input_len, &spans);
        total_prefix += prefix_tokens(entry.input_len, &spans);
    }

    if total_input_tokens == 0 || count == 0 {
        return Ok(AggregateRates {
            count,
            ..Default::default()
        });
    }

    let prefix = total_prefix as f64 / total_input_tokens as f64;
    let substring = total_substring as f64 / total_input_tokens as f64;
    Ok(AggregateRates {
        count,
        avg_tokens: total_input_tokens as f64 / count as f64,
        prefix,
        substring,
        gap: substring - prefix,
    })
}
