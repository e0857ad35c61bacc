//! Linear trend model

use crate::error::Result;
use crate::models::{require_observations, ForecastModel, ForecastResult, TrainedForecastModel};
use margin_math::regression::LinearTrend;

/// Least-squares line over the observation index, extrapolated forward
#[derive(Debug, Clone, Default)]
pub struct LinearTrendModel;

/// Trained linear trend model
#[derive(Debug, Clone)]
pub struct TrainedLinearTrend {
    trend: LinearTrend,
    history: Vec<f64>,
    fitted: Vec<Option<f64>>,
}

impl LinearTrendModel {
    pub fn new() -> Self {
        Self
    }
}

impl ForecastModel for LinearTrendModel {
    fn id(&self) -> &str {
        "trend"
    }

    fn name(&self) -> &str {
        "Linear Trend"
    }

    fn min_observations(&self) -> usize {
        3
    }

    fn train(&self, data: &[f64]) -> Result<Box<dyn TrainedForecastModel>> {
        require_observations(data, self.min_observations(), self.name())?;
        let trend = LinearTrend::fit(data)?;

        Ok(Box::new(TrainedLinearTrend {
            trend,
            history: data.to_vec(),
            fitted: (0..data.len()).map(|t| Some(trend.value_at(t))).collect(),
        }))
    }
}

impl TrainedLinearTrend {
    pub fn slope(&self) -> f64 {
        self.trend.slope()
    }
}

impl TrainedForecastModel for TrainedLinearTrend {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let values = (1..=horizon).map(|h| self.trend.forecast(h)).collect();
        ForecastResult::new(values, horizon)
    }

    fn fitted(&self) -> &[Option<f64>] {
        &self.fitted
    }

    fn history(&self) -> &[f64] {
        &self.history
    }

    fn name(&self) -> &str {
        "Linear Trend"
    }
}
