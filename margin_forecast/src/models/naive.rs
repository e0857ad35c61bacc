//! Baseline models: naive, grand mean, seasonal naive and drift

use crate::error::{ForecastError, Result};
use crate::models::{require_observations, ForecastModel, ForecastResult, TrainedForecastModel};
use margin_math::stats;

/// Naive forecast: every future value equals the last observation
#[derive(Debug, Clone, Default)]
pub struct Naive;

/// Grand mean forecast: every future value equals the mean of the history
#[derive(Debug, Clone, Default)]
pub struct GrandMean;

/// Seasonal naive forecast: repeat the last observed season
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    name: String,
    period: usize,
}

/// Random walk with drift: extend the line through the first and last observation
#[derive(Debug, Clone, Default)]
pub struct Drift;

/// How a trained baseline extrapolates
#[derive(Debug, Clone)]
enum Extrapolation {
    Constant(f64),
    Season(Vec<f64>),
    Line { last: f64, slope: f64 },
}

/// A trained baseline model
#[derive(Debug, Clone)]
pub struct TrainedBaseline {
    name: String,
    history: Vec<f64>,
    fitted: Vec<Option<f64>>,
    extrapolation: Extrapolation,
}

impl Naive {
    pub fn new() -> Self {
        Self
    }
}

impl GrandMean {
    pub fn new() -> Self {
        Self
    }
}

impl SeasonalNaive {
    /// Create a seasonal naive model with the given season length
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(ForecastError::InvalidParameter(
                "Season length must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Seasonal Naive (period={})", period),
            period,
        })
    }
}

impl Drift {
    pub fn new() -> Self {
        Self
    }
}

impl ForecastModel for Naive {
    fn id(&self) -> &str {
        "naive"
    }

    fn name(&self) -> &str {
        "Naive"
    }

    fn min_observations(&self) -> usize {
        1
    }

    fn train(&self, data: &[f64]) -> Result<Box<dyn TrainedForecastModel>> {
        require_observations(data, self.min_observations(), self.name())?;

        let fitted = std::iter::once(None)
            .chain(data[..data.len() - 1].iter().map(|&v| Some(v)))
            .collect();

        Ok(Box::new(TrainedBaseline {
            name: self.name().to_string(),
            history: data.to_vec(),
            fitted,
            extrapolation: Extrapolation::Constant(data[data.len() - 1]),
        }))
    }
}

impl ForecastModel for GrandMean {
    fn id(&self) -> &str {
        "grand_mean"
    }

    fn name(&self) -> &str {
        "Grand Mean"
    }

    fn min_observations(&self) -> usize {
        1
    }

    fn train(&self, data: &[f64]) -> Result<Box<dyn TrainedForecastModel>> {
        require_observations(data, self.min_observations(), self.name())?;
        let mean = stats::mean(data)?;

        Ok(Box::new(TrainedBaseline {
            name: self.name().to_string(),
            history: data.to_vec(),
            fitted: vec![Some(mean); data.len()],
            extrapolation: Extrapolation::Constant(mean),
        }))
    }
}

impl ForecastModel for SeasonalNaive {
    fn id(&self) -> &str {
        "snaive"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_observations(&self) -> usize {
        self.period
    }

    fn train(&self, data: &[f64]) -> Result<Box<dyn TrainedForecastModel>> {
        require_observations(data, self.min_observations(), self.name())?;

        let fitted = (0..data.len())
            .map(|i| i.checked_sub(self.period).map(|j| data[j]))
            .collect();

        Ok(Box::new(TrainedBaseline {
            name: self.name.clone(),
            history: data.to_vec(),
            fitted,
            extrapolation: Extrapolation::Season(data[data.len() - self.period..].to_vec()),
        }))
    }
}

impl ForecastModel for Drift {
    fn id(&self) -> &str {
        "drift"
    }

    fn name(&self) -> &str {
        "Drift"
    }

    fn min_observations(&self) -> usize {
        2
    }

    fn train(&self, data: &[f64]) -> Result<Box<dyn TrainedForecastModel>> {
        require_observations(data, self.min_observations(), self.name())?;

        let last = data[data.len() - 1];
        let slope = (last - data[0]) / (data.len() - 1) as f64;
        let fitted = std::iter::once(None)
            .chain(data[..data.len() - 1].iter().map(|&v| Some(v + slope)))
            .collect();

        Ok(Box::new(TrainedBaseline {
            name: self.name().to_string(),
            history: data.to_vec(),
            fitted,
            extrapolation: Extrapolation::Line { last, slope },
        }))
    }
}

impl TrainedForecastModel for TrainedBaseline {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let values = (1..=horizon)
            .map(|h| match &self.extrapolation {
                Extrapolation::Constant(value) => *value,
                Extrapolation::Season(season) => season[(h - 1) % season.len()],
                Extrapolation::Line { last, slope } => last + slope * h as f64,
            })
            .collect();

        ForecastResult::new(values, horizon)
    }

    fn fitted(&self) -> &[Option<f64>] {
        &self.fitted
    }

    fn history(&self) -> &[f64] {
        &self.history
    }

    fn name(&self) -> &str {
        &self.name
    }
}
