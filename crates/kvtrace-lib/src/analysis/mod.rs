//! Offline aggregation over collected files: match rates, workload
//! breakdown metrics, and the Markdown matrix report.

pub mod breakdown_metrics;
pub mod chart;
pub mod rates;
pub mod report;

pub use breakdown_metrics::{compute_breakdown_metrics, BreakdownMetrics, PatternStat};
pub use chart::render_comparison_chart;
pub use rates::{compute_rates, AggregateRates};
pub use report::{render_matrix_report, CellStatus};
