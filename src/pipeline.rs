//! The pipeline stages
//!
//! - enrichment: CSV to enriched table (overwrites the stored table)
//! - trends: month-over-month views of the stored table
//! - forecast: experiment over the stored table's monthly margin series
//!
//! Stages communicate only through the table store, so each can run as its
//! own invocation.

use crate::config::{EtlConfig, ForecastConfig};
use crate::error::{PipelineError, Result};
use margin_etl::{
    compute_trend, compute_trends, enrich, CsvSource, Partition, TableProfile, TableStore,
    TrendView,
};
use margin_forecast::{
    Experiment, ForecastResult, HoldoutPrediction, Leaderboard, MonthlySeries, SeriesStats,
};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of an enrichment run
#[derive(Debug, Clone)]
pub struct EnrichmentSummary {
    pub rows: usize,
    pub table_path: PathBuf,
    pub profile: TableProfile,
}

/// Load the source CSV, compute margins and replace the stored table
pub fn run_enrichment(config: &EtlConfig) -> Result<EnrichmentSummary> {
    let rows = CsvSource::from_path(&config.input)?;
    let table = enrich(&rows, config.zero_cost)?;
    let profile = table.profile()?;

    let store = TableStore::new(&config.warehouse);
    let table_path = store.overwrite(&config.table, &table)?;

    info!(
        rows = table.len(),
        table = %config.table,
        "Enrichment finished"
    );
    Ok(EnrichmentSummary {
        rows: table.len(),
        table_path,
        profile,
    })
}

/// A computed trend view and where it was exported, if anywhere
#[derive(Debug, Clone)]
pub struct TrendOutput {
    pub label: String,
    pub view: TrendView,
    pub export: Option<PathBuf>,
}

/// Compute the configured trend views of the stored table
pub fn run_trends(config: &EtlConfig) -> Result<Vec<TrendOutput>> {
    let table = TableStore::new(&config.warehouse).read(&config.table)?;

    let mut views = Vec::with_capacity(config.partitions.len() + 1);
    for partition in &config.partitions {
        views.push((partition.to_string(), compute_trend(&table, *partition)?));
    }
    if config.combined_view {
        views.push((
            "combined".to_string(),
            compute_trends(&table, &[Partition::Region, Partition::ProductLine])?,
        ));
    }

    let mut outputs = Vec::with_capacity(views.len());
    for (label, view) in views {
        let export = match &config.trends_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = dir.join(format!("{}_trend.csv", label));
                view.write_csv(&path)?;
                Some(path)
            }
            None => None,
        };
        outputs.push(TrendOutput {
            label,
            view,
            export,
        });
    }

    info!(views = outputs.len(), "Trend views computed");
    Ok(outputs)
}

/// Everything the forecast stage produces
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub stats: SeriesStats,
    pub leaderboard: Leaderboard,
    /// Identifier of the selected model
    pub best_model: String,
    pub holdout: HoldoutPrediction,
    /// Prediction for the configured `fh`
    pub forecast: ForecastResult,
    /// Prediction for the configured extra horizon
    pub requested_forecast: ForecastResult,
    /// JSON files written to the output directory
    pub files: Vec<PathBuf>,
}

/// Run the forecasting experiment on the stored table
pub fn run_forecast(etl: &EtlConfig, config: &ForecastConfig) -> Result<ForecastReport> {
    let table = TableStore::new(&etl.warehouse).read(&etl.table)?;
    let series = MonthlySeries::from_table(&table, config.aggregation)?;
    let experiment = Experiment::setup(series, config.experiment())?;

    let stats = experiment.check_stats()?;
    let leaderboard = experiment.compare_models()?;
    let best = experiment.select_best(&leaderboard)?;
    let holdout = experiment.predict_holdout(&best)?;

    let residual_plot = experiment.plot_residuals(&best)?;
    let forecast_plot = experiment.plot_forecast(&best, config.fh)?;
    let extended_plot = experiment.plot_forecast(&best, config.extended_horizon)?;

    let final_model = experiment.finalize(&best)?;
    let forecast = experiment.predict(&final_model, config.fh)?;
    let requested_forecast = experiment.predict(&final_model, config.predict_horizon)?;

    fs::create_dir_all(&config.output_dir)?;
    let dir = config.output_dir.as_path();
    let files = vec![
        write_json(dir, "leaderboard.json", &leaderboard)?,
        write_json(dir, "holdout.json", &holdout)?,
        write_json(dir, "forecast.json", &forecast)?,
        write_json(
            dir,
            &format!("forecast_{}.json", config.predict_horizon),
            &requested_forecast,
        )?,
        plot_file(dir, "forecast_plot.json", |p| forecast_plot.write_json(p))?,
        plot_file(dir, "forecast_plot_extended.json", |p| {
            extended_plot.write_json(p)
        })?,
        plot_file(dir, "residuals_plot.json", |p| residual_plot.write_json(p))?,
    ];

    info!(
        model = best.id(),
        horizon = config.predict_horizon,
        files = files.len(),
        "Forecast finished"
    );
    Ok(ForecastReport {
        stats,
        leaderboard,
        best_model: best.id().to_string(),
        holdout,
        forecast,
        requested_forecast,
        files,
    })
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(path)
}

fn plot_file<F>(dir: &Path, name: &str, write: F) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> margin_forecast::Result<()>,
{
    let path = dir.join(name);
    write(&path).map_err(PipelineError::from)?;
    Ok(path)
}
