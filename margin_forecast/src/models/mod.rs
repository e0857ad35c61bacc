//! Forecasting models for monthly margin series

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Debug;

pub mod ets;
pub mod moving_average;
pub mod naive;
pub mod trend;

/// Forecast result containing predicted values
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    /// Forecasted values
    pub(crate) values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
    /// Prediction intervals (optional)
    pub(crate) intervals: Option<Vec<(f64, f64)>>,
    /// Months the values belong to (optional)
    pub(crate) months: Option<Vec<NaiveDate>>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self {
            values,
            horizons,
            intervals: None,
            months: None,
        })
    }

    /// Attach prediction intervals, one per value
    pub fn with_intervals(mut self, intervals: Vec<(f64, f64)>) -> Result<Self> {
        if self.values.len() != intervals.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match intervals length ({})",
                self.values.len(),
                intervals.len()
            )));
        }

        self.intervals = Some(intervals);
        Ok(self)
    }

    /// Attach the months being forecast, one per value
    pub fn with_months(mut self, months: Vec<NaiveDate>) -> Result<Self> {
        if self.values.len() != months.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match months length ({})",
                self.values.len(),
                months.len()
            )));
        }

        self.months = Some(months);
        Ok(self)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Get the prediction intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Get the months, if available
    pub fn months(&self) -> Option<&[NaiveDate]> {
        self.months.as_deref()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for the periods after the training data
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// One-step-ahead in-sample predictions, aligned with the training data.
    ///
    /// `None` where the model has no prediction yet (for example the first
    /// observation of a naive model).
    fn fitted(&self) -> &[Option<f64>];

    /// The data the model was trained on
    fn history(&self) -> &[f64];

    /// Name of the model
    fn name(&self) -> &str;

    /// In-sample residuals `actual - fitted`, aligned with the training data
    fn residuals(&self) -> Vec<Option<f64>> {
        self.history()
            .iter()
            .zip(self.fitted())
            .map(|(actual, fitted)| fitted.map(|f| actual - f))
            .collect()
    }
}

/// Forecast model that can be trained on a series of observations
pub trait ForecastModel: Debug {
    /// Short identifier used on the leaderboard and the command line
    fn id(&self) -> &str;

    /// Get the name of the model
    fn name(&self) -> &str;

    /// Fewest observations the model can be trained on
    fn min_observations(&self) -> usize;

    /// Train the model on a series of observations
    fn train(&self, data: &[f64]) -> Result<Box<dyn TrainedForecastModel>>;
}

/// Fail unless `data` has at least `min` observations
pub(crate) fn require_observations(data: &[f64], min: usize, model: &str) -> Result<()> {
    if data.len() < min {
        return Err(ForecastError::InsufficientData(format!(
            "{} needs at least {} observations, got {}",
            model,
            min,
            data.len()
        )));
    }
    Ok(())
}

/// The candidate set compared by an experiment, in leaderboard tie order
pub fn default_candidates() -> Result<Vec<Box<dyn ForecastModel>>> {
    let candidates: Vec<Box<dyn ForecastModel>> = vec![
        Box::new(naive::Naive::new()),
        Box::new(naive::GrandMean::new()),
        Box::new(naive::SeasonalNaive::new(12)?),
        Box::new(naive::Drift::new()),
        Box::new(trend::LinearTrendModel::new()),
        Box::new(moving_average::SimpleMA::new(3)?),
        Box::new(ets::EtsModel::simple()?),
        Box::new(ets::EtsModel::holt()?),
        Box::new(ets::EtsModel::auto()?),
    ];
    Ok(candidates)
}
