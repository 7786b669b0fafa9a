//! Cross-cell comparison chart.
//!
//! Renders a grouped bar chart (prefix vs. substring rate per analyzed
//! cell, plus a gap panel underneath) as a standalone SVG document built
//! from the same match files the report reads. Cells without a matches
//! file are left out; an all-empty matrix yields no chart.

use anyhow::Result;
use std::fmt::Write as _;
use tracing::warn;

use crate::analysis::rates::{compute_rates, AggregateRates};
use crate::collectors::SCAFFOLD_CHOICES;
use crate::config::Config;
use crate::datasets::DATASET_CHOICES;
use crate::paths::matches_path;

const PREFIX_COLOR: &str = "#4A90D9";
const SUBSTRING_COLOR: &str = "#D94A7A";
const GAP_HIGHLIGHT_COLOR: &str = "#FF6B35";
const GAP_MUTED_COLOR: &str = "#888888";

const BAR_WIDTH: f64 = 26.0;
const GROUP_WIDTH: f64 = 110.0;
const RATE_PANEL_HEIGHT: f64 = 280.0;
const GAP_PANEL_HEIGHT: f64 = 90.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_TOP: f64 = 50.0;
const PANEL_GAP: f64 = 90.0;
const MARGIN_BOTTOM: f64 = 40.0;

struct ChartCell {
    scaffold: &'static str,
    dataset: &'static str,
    rates: AggregateRates,
}

fn svg_bar(out: &mut String, x: f64, y: f64, w: f64, h: f64, color: &str) {
    let _ = writeln!(
        out,
        r#"  <rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{color}" stroke="white" stroke-width="0.5"/>"#
    );
}

fn svg_text(out: &mut String, x: f64, y: f64, size: u32, color: &str, weight: &str, text: &str) {
    let escaped = text.replace('&', "&amp;").replace('<', "&lt;");
    let _ = writeln!(
        out,
        r#"  <text x="{x:.1}" y="{y:.1}" font-size="{size}" fill="{color}" font-weight="{weight}" text-anchor="middle" font-family="sans-serif">{escaped}</text>"#
    );
}

/// Render the comparison chart over every analyzed cell, or `None` when no
/// cell has a matches file yet.
pub fn render_comparison_chart(config: &Config) -> Result<Option<String>> {
    let traces_dir = config.traces_dir.as_path();
    let mut cells = Vec::new();
    for dataset in DATASET_CHOICES {
        for scaffold in SCAFFOLD_CHOICES {
            let matches_file = matches_path(traces_dir, scaffold, dataset);
            if !matches_file.exists() {
                continue;
            }
            match compute_rates(&matches_file) {
                Ok(rates) => cells.push(ChartCell {
                    scaffold,
                    dataset,
                    rates,
                }),
                Err(e) => warn!(scaffold, dataset, error = %e, "Skipping unreadable matches file"),
            }
        }
    }
    if cells.is_empty() {
        return Ok(None);
    }

    let width = MARGIN_LEFT + cells.len() as f64 * GROUP_WIDTH + 40.0;
    let height = MARGIN_TOP + RATE_PANEL_HEIGHT + PANEL_GAP + GAP_PANEL_HEIGHT + MARGIN_BOTTOM;
    let rate_base = MARGIN_TOP + RATE_PANEL_HEIGHT;
    let gap_base = rate_base + PANEL_GAP + GAP_PANEL_HEIGHT;

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}">"#
    );
    let _ = writeln!(out, r#"  <rect width="100%" height="100%" fill="white"/>"#);
    svg_text(
        &mut out,
        width / 2.0,
        24.0,
        16,
        "black",
        "bold",
        "Prefix vs Substring Hit Rate by Scaffold",
    );

    // rate panel gridlines, 20% steps
    for step in 0..=5 {
        let pct = step as f64 * 20.0;
        let y = rate_base - pct / 100.0 * RATE_PANEL_HEIGHT;
        let _ = writeln!(
            out,
            r##"  <line x1="{MARGIN_LEFT:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#dddddd"/>"##,
            width - 30.0
        );
        svg_text(&mut out, MARGIN_LEFT - 24.0, y + 4.0, 10, "gray", "normal", &format!("{pct:.0}%"));
    }

    // legend
    svg_bar(&mut out, MARGIN_LEFT, 34.0, 12.0, 12.0, PREFIX_COLOR);
    svg_text(&mut out, MARGIN_LEFT + 50.0, 44.0, 11, "black", "normal", "Prefix");
    svg_bar(&mut out, MARGIN_LEFT + 90.0, 34.0, 12.0, 12.0, SUBSTRING_COLOR);
    svg_text(&mut out, MARGIN_LEFT + 150.0, 44.0, 11, "black", "normal", "Substring");

    let max_gap_pct = cells
        .iter()
        .map(|c| c.rates.gap * 100.0)
        .fold(10.0_f64, f64::max);

    for (i, cell) in cells.iter().enumerate() {
        let center = MARGIN_LEFT + i as f64 * GROUP_WIDTH + GROUP_WIDTH / 2.0;
        let prefix_pct = cell.rates.prefix * 100.0;
        let substring_pct = cell.rates.substring * 100.0;
        let gap_pct = cell.rates.gap * 100.0;

        let prefix_h = prefix_pct / 100.0 * RATE_PANEL_HEIGHT;
        let substring_h = substring_pct / 100.0 * RATE_PANEL_HEIGHT;
        svg_bar(&mut out, center - BAR_WIDTH - 1.0, rate_base - prefix_h, BAR_WIDTH, prefix_h, PREFIX_COLOR);
        svg_bar(&mut out, center + 1.0, rate_base - substring_h, BAR_WIDTH, substring_h, SUBSTRING_COLOR);
        svg_text(
            &mut out,
            center - BAR_WIDTH / 2.0 - 1.0,
            rate_base - prefix_h - 4.0,
            9,
            PREFIX_COLOR,
            "bold",
            &format!("{prefix_pct:.1}%"),
        );
        svg_text(
            &mut out,
            center + BAR_WIDTH / 2.0 + 1.0,
            rate_base - substring_h - 4.0,
            9,
            SUBSTRING_COLOR,
            "bold",
            &format!("{substring_pct:.1}%"),
        );

        svg_text(&mut out, center, rate_base + 16.0, 11, "black", "normal", cell.scaffold);
        svg_text(&mut out, center, rate_base + 30.0, 10, "black", "normal", cell.dataset);
        svg_text(
            &mut out,
            center,
            rate_base + 44.0,
            8,
            "gray",
            "normal",
            &format!("{} calls, {:.0} tok/call", cell.rates.count, cell.rates.avg_tokens),
        );

        let gap_h = gap_pct / max_gap_pct * GAP_PANEL_HEIGHT;
        let gap_color = if gap_pct > 5.0 { GAP_HIGHLIGHT_COLOR } else { GAP_MUTED_COLOR };
        svg_bar(&mut out, center - BAR_WIDTH * 0.75, gap_base - gap_h, BAR_WIDTH * 1.5, gap_h, gap_color);
        svg_text(
            &mut out,
            center,
            gap_base - gap_h - 4.0,
            10,
            gap_color,
            "bold",
            &format!("+{gap_pct:.1}%"),
        );
    }

    svg_text(
        &mut out,
        width / 2.0,
        rate_base + PANEL_GAP - 14.0,
        12,
        "black",
        "bold",
        "Substring - Prefix Gap",
    );

    let _ = writeln!(out, "</svg>");
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn test_config(traces_dir: &std::path::Path) -> Config {
        let mut config = Config::from_env();
        config.traces_dir = traces_dir.to_path_buf();
        config
    }

    fn write_matches(traces_dir: &std::path::Path, scaffold: &str, dataset: &str) {
        let path = matches_path(traces_dir, scaffold, dataset);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            format!(
                "{}\n",
                serde_json::json!({
                    "InputLen": 10,
                    "Matches": [{"MatchStart": 0, "MatchEnd": 5}]
                })
            ),
        )
        .unwrap();
    }

    #[test]
    #[serial]
    fn empty_matrix_renders_no_chart() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        assert!(render_comparison_chart(&config).unwrap().is_none());
    }

    #[test]
    #[serial]
    fn analyzed_cells_become_labeled_bar_groups() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        write_matches(temp_dir.path(), "baseline", "corpus50");
        write_matches(temp_dir.path(), "temporal", "corpus50");

        let svg = render_comparison_chart(&config).unwrap().unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>\n"));
        assert!(svg.contains(">baseline</text>"));
        assert!(svg.contains(">temporal</text>"));
        assert!(svg.contains("50.0%"));
        assert!(svg.contains("1 calls, 10 tok/call"));
        // zero gap stays muted
        assert!(svg.contains(GAP_MUTED_COLOR));
        assert!(!svg.contains(GAP_HIGHLIGHT_COLOR));
    }
}
