use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::subscriber;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

use kvtrace_lib::Config;
use kvtrace_runner::analyze::{any_analysis_failed, print_analysis_summary, run_analysis};
use kvtrace_runner::matrix::{any_cell_failed, print_matrix_summary, run_matrix, MatrixOptions};
use kvtrace_runner::preflight::{any_check_failed, print_preflight_summary, run_preflight};
use kvtrace_runner::{resolve_datasets, resolve_scaffolds, write_chart, write_report};

/// Command-line runner for the kvtrace collection matrix.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run trace collection for (dataset x scaffold) cells
    Collect {
        /// Dataset to run, or `all`
        #[arg(long, default_value = "all")]
        dataset: String,
        /// Scaffold to run, or `all`
        #[arg(long, default_value = "all")]
        scaffold: String,
        /// Optional cap on number of dataset rows
        #[arg(long)]
        num_items: Option<usize>,
        /// Skip a cell if its trace file already exists
        #[arg(long)]
        skip_existing: bool,
        /// Also capture the workload breakdown log per cell
        #[arg(long)]
        with_breakdown: bool,
    },
    /// Run the external token-matching analyzer over collected traces
    Analyze {
        /// Dataset to analyze, or `all`
        #[arg(long, default_value = "all")]
        dataset: String,
        /// Scaffold to analyze, or `all`
        #[arg(long, default_value = "all")]
        scaffold: String,
    },
    /// Render the Markdown matrix report from on-disk files
    Report {
        /// Output Markdown path
        #[arg(short, long, default_value = "docs/matrix_breakdown.md")]
        output: PathBuf,
    },
    /// Render the cross-cell comparison chart (SVG) from match files
    Chart {
        /// Output SVG path
        #[arg(short, long, default_value = "docs/comparison_chart.svg")]
        output: PathBuf,
    },
    /// Verify the endpoint supports chat completions, tool calling, and JSON mode
    Check,
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvtrace_lib=debug,kvtrace_runner=debug"));
    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    subscriber::set_global_default(subscriber)
        .context("Failed to set global default tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Collect {
            dataset,
            scaffold,
            num_items,
            skip_existing,
            with_breakdown,
        } => {
            let options = MatrixOptions {
                datasets: resolve_datasets(&dataset)?,
                scaffolds: resolve_scaffolds(&scaffold)?,
                num_items,
                skip_existing,
                with_breakdown,
            };
            let results = run_matrix(&config, &options).await?;
            print_matrix_summary(&results);
            if any_cell_failed(&results) {
                std::process::exit(1);
            }
        }
        Commands::Analyze { dataset, scaffold } => {
            let datasets = resolve_datasets(&dataset)?;
            let scaffolds = resolve_scaffolds(&scaffold)?;
            let results = run_analysis(&config, &datasets, &scaffolds).await;
            print_analysis_summary(&results);
            if any_analysis_failed(&results) {
                std::process::exit(1);
            }
        }
        Commands::Report { output } => {
            write_report(&config, &output)?;
        }
        Commands::Chart { output } => {
            write_chart(&config, &output)?;
        }
        Commands::Check => {
            let results = run_preflight(&config).await;
            print_preflight_summary(&results);
            if any_check_failed(&results) {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
