//! region-margin command line tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use margin_etl::{Partition, ZeroCostPolicy};
use margin_forecast::ForecastResult;
use region_margin_workspace::config::PipelineConfig;
use region_margin_workspace::pipeline::{
    run_enrichment, run_forecast, run_trends, ForecastReport, TrendOutput,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "region-margin")]
#[command(about = "Regional product-line margin enrichment, trends and forecasting", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `margin_forecast=trace`; overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the source CSV, compute margins and overwrite the stored table
    Enrich {
        /// Source CSV
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Zero-cost handling (null, propagate, reject)
        #[arg(long)]
        zero_cost: Option<ZeroCostPolicy>,
    },

    /// Compute month-over-month trend views of the stored table
    Trends {
        /// Partition to compute (global, region, product_line, region_product_line); repeatable
        #[arg(short, long)]
        partition: Vec<Partition>,

        /// Directory to export the views to as CSV
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Rows to print per view
        #[arg(long)]
        rows: Option<usize>,
    },

    /// Run the forecasting experiment on the stored table
    Forecast {
        /// Forecast horizon for the holdout and model comparison
        #[arg(long)]
        fh: Option<usize>,

        /// Extra prediction horizon
        #[arg(long)]
        horizon: Option<usize>,

        /// Directory for plot and prediction files
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Enrichment, trends and forecast in one go
    Run,
}

fn init_tracing(cli_level: Option<&str>, config_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.config.as_deref()).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            cli.config
                .as_deref()
                .map_or_else(|| "defaults".to_string(), |p| p.display().to_string())
        )
    })?;
    init_tracing(cli.log_level.as_deref(), &config.logging.level);
    info!("Starting region-margin v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Enrich { input, zero_cost } => {
            if let Some(input) = input {
                config.etl.input = input;
            }
            if let Some(policy) = zero_cost {
                config.etl.zero_cost = policy;
            }
            enrich_stage(&config)?;
        }
        Commands::Trends {
            partition,
            export,
            rows,
        } => {
            if !partition.is_empty() {
                config.etl.partitions = partition;
                config.etl.combined_view = false;
            }
            if export.is_some() {
                config.etl.trends_dir = export;
            }
            if let Some(rows) = rows {
                config.etl.preview_rows = rows;
            }
            trends_stage(&config)?;
        }
        Commands::Forecast {
            fh,
            horizon,
            output,
        } => {
            if let Some(fh) = fh {
                config.forecast.fh = fh;
            }
            if let Some(horizon) = horizon {
                config.forecast.predict_horizon = horizon;
            }
            if let Some(output) = output {
                config.forecast.output_dir = output;
            }
            config.validate()?;
            forecast_stage(&config)?;
        }
        Commands::Run => {
            enrich_stage(&config)?;
            trends_stage(&config)?;
            forecast_stage(&config)?;
        }
    }

    Ok(())
}

fn enrich_stage(config: &PipelineConfig) -> Result<()> {
    let summary = run_enrichment(&config.etl).with_context(|| {
        format!("Enrichment of {} failed", config.etl.input.display())
    })?;

    println!("{}", summary.profile);
    println!(
        "Wrote {} rows to {}",
        summary.rows,
        summary.table_path.display()
    );
    Ok(())
}

fn trends_stage(config: &PipelineConfig) -> Result<()> {
    let outputs = run_trends(&config.etl).context("Trend computation failed")?;
    for output in &outputs {
        print_trend(output, config.etl.preview_rows);
    }
    Ok(())
}

fn print_trend(output: &TrendOutput, rows: usize) {
    println!(
        "\n== {} ({} rows) ==",
        output.label,
        output.view.len()
    );
    println!("{}", output.view.dataframe().head(Some(rows)));
    if let Some(path) = &output.export {
        println!("Exported to {}", path.display());
    }
}

fn forecast_stage(config: &PipelineConfig) -> Result<()> {
    let report = run_forecast(&config.etl, &config.forecast).context("Forecast failed")?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ForecastReport) {
    println!("{}", report.stats);
    println!("{}", report.leaderboard);
    println!("Selected model: {}\n", report.best_model);
    println!("{}", report.holdout);
    print_forecast("Forecast", &report.forecast);
    print_forecast("Requested forecast", &report.requested_forecast);
    for file in &report.files {
        println!("Wrote {}", file.display());
    }
}

fn print_forecast(title: &str, forecast: &ForecastResult) {
    println!("{} ({} months):", title, forecast.horizons());
    let months = forecast.months().unwrap_or_default();
    for (i, value) in forecast.values().iter().enumerate() {
        let month = months
            .get(i)
            .map_or_else(|| format!("t+{}", i + 1), |m| m.to_string());
        match forecast.intervals().map(|intervals| intervals[i]) {
            Some((lower, upper)) => println!(
                "  {:<12} {:>10.4}  [{:.4}, {:.4}]",
                month, value, lower, upper
            ),
            None => println!("  {:<12} {:>10.4}", month, value),
        }
    }
    println!();
}
