//! Deterministic file layout for one (scaffold, dataset) matrix cell.
//!
//! Every tool in the pipeline (collection, analysis, reporting) recomputes
//! these paths from the same key instead of passing them around, so a
//! re-run always lands on the same files.

use std::path::{Path, PathBuf};

/// Canonical cell key: `{scaffold}_{dataset}`.
pub fn matrix_key(scaffold: &str, dataset: &str) -> String {
    format!("{scaffold}_{dataset}")
}

/// Trace file: `{traces_dir}/{key}/{key}_session.jsonl`.
pub fn trace_path(traces_dir: &Path, scaffold: &str, dataset: &str) -> PathBuf {
    let key = matrix_key(scaffold, dataset);
    traces_dir.join(&key).join(format!("{key}_session.jsonl"))
}

/// Breakdown file: `{traces_dir}/{key}/{key}_breakdown.jsonl`.
pub fn breakdown_path(traces_dir: &Path, scaffold: &str, dataset: &str) -> PathBuf {
    let key = matrix_key(scaffold, dataset);
    traces_dir.join(&key).join(format!("{key}_breakdown.jsonl"))
}

/// Analyzer result directory: `{traces_dir}/{key}_result`.
pub fn result_dir(traces_dir: &Path, scaffold: &str, dataset: &str) -> PathBuf {
    traces_dir.join(format!("{}_result", matrix_key(scaffold, dataset)))
}

/// Analyzer plot output: `{result_dir}/{key}_hit_rate.png`.
pub fn hit_rate_path(traces_dir: &Path, scaffold: &str, dataset: &str) -> PathBuf {
    let key = matrix_key(scaffold, dataset);
    result_dir(traces_dir, scaffold, dataset).join(format!("{key}_hit_rate.png"))
}

/// Analyzer match log: `{result_dir}/{key}_matches.jsonl`.
pub fn matches_path(traces_dir: &Path, scaffold: &str, dataset: &str) -> PathBuf {
    let key = matrix_key(scaffold, dataset);
    result_dir(traces_dir, scaffold, dataset).join(format!("{key}_matches.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_paths_share_the_matrix_key() {
        let traces_dir = Path::new("/tmp/traces");

        assert_eq!(
            trace_path(traces_dir, "graphmem", "corpus50"),
            Path::new("/tmp/traces/graphmem_corpus50/graphmem_corpus50_session.jsonl")
        );
        assert_eq!(
            breakdown_path(traces_dir, "graphmem", "corpus50"),
            Path::new("/tmp/traces/graphmem_corpus50/graphmem_corpus50_breakdown.jsonl")
        );
        assert_eq!(
            hit_rate_path(traces_dir, "temporal", "bench_airline"),
            Path::new(
                "/tmp/traces/temporal_bench_airline_result/temporal_bench_airline_hit_rate.png"
            )
        );
        assert_eq!(
            matches_path(traces_dir, "temporal", "bench_airline"),
            Path::new(
                "/tmp/traces/temporal_bench_airline_result/temporal_bench_airline_matches.jsonl"
            )
        );
    }
}
