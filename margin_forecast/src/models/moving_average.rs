//! Moving average model for time series forecasting

use crate::error::{ForecastError, Result};
use crate::models::{require_observations, ForecastModel, ForecastResult, TrainedForecastModel};

/// Simple Moving Average model
#[derive(Debug, Clone)]
pub struct SimpleMA {
    /// Name of the model
    name: String,
    /// Window size
    window: usize,
}

/// Trained Simple Moving Average model
#[derive(Debug, Clone)]
pub struct TrainedSimpleMA {
    /// Name of the model
    name: String,
    /// Historical data
    history: Vec<f64>,
    /// Average of the trailing window before each observation
    fitted: Vec<Option<f64>>,
    /// Last calculated average
    last_average: f64,
}

impl SimpleMA {
    /// Create a new Simple Moving Average model
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Simple Moving Average (window={})", window),
            window,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl ForecastModel for SimpleMA {
    fn id(&self) -> &str {
        "sma"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_observations(&self) -> usize {
        self.window
    }

    fn train(&self, data: &[f64]) -> Result<Box<dyn TrainedForecastModel>> {
        require_observations(data, self.min_observations(), &self.name)?;

        let average = |window: &[f64]| window.iter().sum::<f64>() / window.len() as f64;

        let fitted = (0..data.len())
            .map(|i| (i >= self.window).then(|| average(&data[i - self.window..i])))
            .collect();

        Ok(Box::new(TrainedSimpleMA {
            name: self.name.clone(),
            history: data.to_vec(),
            fitted,
            last_average: average(&data[data.len() - self.window..]),
        }))
    }
}

impl TrainedForecastModel for TrainedSimpleMA {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        // A simple moving average forecasts flat at the last window's mean
        ForecastResult::new(vec![self.last_average; horizon], horizon)
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
