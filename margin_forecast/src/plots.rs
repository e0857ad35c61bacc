//! Plot data for forecasts and residuals
//!
//! Plots are emitted as serializable point lists rather than images; a
//! dashboard or notebook renders them.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastResult, TrainedForecastModel};
use crate::series::MonthlySeries;
use chrono::NaiveDate;
use margin_math::{ljung_box, stats, LjungBox};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// One month of a forecast plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub month: NaiveDate,
    /// Observed margin (history only)
    pub actual: Option<f64>,
    /// In-sample one-step prediction (history only)
    pub fitted: Option<f64>,
    /// Out-of-sample prediction (future only)
    pub forecast: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Observed history, fitted values and forecast of one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPlot {
    pub model: String,
    pub horizon: usize,
    pub points: Vec<ForecastPoint>,
}

impl ForecastPlot {
    /// Assemble the plot from a trained model and its forecast.
    ///
    /// The forecast must carry its months.
    pub fn new(
        model: &str,
        series: &MonthlySeries,
        trained: &dyn TrainedForecastModel,
        forecast: &ForecastResult,
    ) -> Result<Self> {
        let history = trained.history();
        if history.len() > series.len() {
            return Err(ForecastError::ValidationError(format!(
                "Model history ({}) is longer than the series ({})",
                history.len(),
                series.len()
            )));
        }

        let months = forecast.months().ok_or_else(|| {
            ForecastError::ValidationError("Forecast has no months attached".to_string())
        })?;

        let mut points: Vec<ForecastPoint> = series.months()[..history.len()]
            .iter()
            .zip(history.iter().zip(trained.fitted()))
            .map(|(month, (actual, fitted))| ForecastPoint {
                month: *month,
                actual: Some(*actual),
                fitted: *fitted,
                forecast: None,
                lower: None,
                upper: None,
            })
            .collect();

        for (i, (month, value)) in months.iter().zip(forecast.values()).enumerate() {
            let interval = forecast.intervals().map(|intervals| intervals[i]);
            points.push(ForecastPoint {
                month: *month,
                actual: None,
                fitted: None,
                forecast: Some(*value),
                lower: interval.map(|(lower, _)| lower),
                upper: interval.map(|(_, upper)| upper),
            });
        }

        Ok(Self {
            model: model.to_string(),
            horizon: forecast.horizons(),
            points,
        })
    }

    /// Points with a forecast value
    pub fn forecast_points(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.forecast.is_some())
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(self, path.as_ref())
    }
}

/// One month of a residual plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualPoint {
    pub month: NaiveDate,
    pub residual: Option<f64>,
}

/// In-sample residuals of one model, with a white-noise check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualPlot {
    pub model: String,
    pub points: Vec<ResidualPoint>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub ljung_box: Option<LjungBox>,
}

impl ResidualPlot {
    pub fn new(
        model: &str,
        series: &MonthlySeries,
        trained: &dyn TrainedForecastModel,
    ) -> Result<Self> {
        let residuals = trained.residuals();
        if residuals.len() > series.len() {
            return Err(ForecastError::ValidationError(format!(
                "Model history ({}) is longer than the series ({})",
                residuals.len(),
                series.len()
            )));
        }

        let points = series.months()[..residuals.len()]
            .iter()
            .zip(&residuals)
            .map(|(month, residual)| ResidualPoint {
                month: *month,
                residual: *residual,
            })
            .collect();

        let present: Vec<f64> = residuals.iter().flatten().copied().collect();

        Ok(Self {
            model: model.to_string(),
            points,
            mean: stats::mean(&present).ok(),
            std_dev: stats::std_dev(&present).ok(),
            ljung_box: ljung_box(&present, residual_lags(present.len())).ok(),
        })
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(self, path.as_ref())
    }
}

/// Lags for the residual white-noise test: a quarter of the sample, at most 12
pub(crate) fn residual_lags(observations: usize) -> usize {
    (observations / 4).clamp(1, 12)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    info!(path = %path.display(), "Wrote plot data");
    Ok(())
}
