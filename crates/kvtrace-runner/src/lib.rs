//! Matrix runner: collection orchestration, analyzer invocation, and
//! report writing over the kvtrace library.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use kvtrace_lib::analysis::{render_comparison_chart, render_matrix_report};
use kvtrace_lib::collectors::{ensure_known_scaffold, SCAFFOLD_CHOICES};
use kvtrace_lib::datasets::DATASET_CHOICES;
use kvtrace_lib::error::{TraceError, TraceResult};
use kvtrace_lib::Config;

pub mod analyze;
pub mod matrix;
pub mod preflight;

/// Expand an `all`-or-name selector into the concrete dataset list.
pub fn resolve_datasets(selector: &str) -> TraceResult<Vec<String>> {
    if selector == "all" {
        return Ok(DATASET_CHOICES.iter().map(|s| s.to_string()).collect());
    }
    if DATASET_CHOICES.contains(&selector) {
        Ok(vec![selector.to_string()])
    } else {
        Err(TraceError::UnknownDataset(selector.to_string()))
    }
}

/// Expand an `all`-or-name selector into the concrete scaffold list.
pub fn resolve_scaffolds(selector: &str) -> TraceResult<Vec<String>> {
    if selector == "all" {
        return Ok(SCAFFOLD_CHOICES.iter().map(|s| s.to_string()).collect());
    }
    ensure_known_scaffold(selector)?;
    Ok(vec![selector.to_string()])
}

/// Render the matrix report and write it to `output_path`.
pub fn write_report(config: &Config, output_path: &Path) -> Result<()> {
    let report = render_matrix_report(config)?;
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory: {parent:?}"))?;
    }
    std::fs::write(output_path, report)
        .with_context(|| format!("Failed to write report: {}", output_path.display()))?;
    info!(report = %output_path.display(), "Report written");
    println!("Report written to: {}", output_path.display());
    Ok(())
}

/// Render the comparison chart and write it to `output_path`. A matrix
/// with no analyzed cells writes nothing.
pub fn write_chart(config: &Config, output_path: &Path) -> Result<()> {
    let Some(svg) = render_comparison_chart(config)? else {
        println!("No analyzed cells to chart.");
        return Ok(());
    };
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create chart directory: {parent:?}"))?;
    }
    std::fs::write(output_path, svg)
        .with_context(|| format!("Failed to write chart: {}", output_path.display()))?;
    info!(chart = %output_path.display(), "Chart written");
    println!("Chart written to: {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_expand_and_validate() {
        assert_eq!(resolve_datasets("all").unwrap().len(), DATASET_CHOICES.len());
        assert_eq!(resolve_datasets("corpus50").unwrap(), vec!["corpus50"]);
        assert!(resolve_datasets("bogus").is_err());

        assert_eq!(resolve_scaffolds("all").unwrap().len(), SCAFFOLD_CHOICES.len());
        assert_eq!(resolve_scaffolds("temporal").unwrap(), vec!["temporal"]);
        assert!(resolve_scaffolds("bogus").is_err());
    }
}
