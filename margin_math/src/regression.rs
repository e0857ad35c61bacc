//! Linear trend over the observation index

use crate::{MathError, Result};

/// Linear trend `y = intercept + slope * t` fitted over `t = 0..n`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    slope: f64,
    intercept: f64,
    observations: usize,
}

impl LinearTrend {
    /// Fit the trend line to a series
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.len() < 2 {
            return Err(MathError::InsufficientData(
                "Not enough data for a linear trend. Need at least 2 points.".to_string(),
            ));
        }

        let n = values.len() as f64;
        let x_mean = (values.len() - 1) as f64 / 2.0;
        let y_mean = values.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, &y) in values.iter().enumerate() {
            let x = i as f64;
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        let slope = numerator / denominator;

        Ok(Self {
            slope,
            intercept: y_mean - slope * x_mean,
            observations: values.len(),
        })
    }

    /// Value of the trend line at index `t`
    pub fn value_at(&self, t: usize) -> f64 {
        self.intercept + self.slope * t as f64
    }

    /// Predict the value n periods after the last observation
    pub fn forecast(&self, periods_ahead: usize) -> f64 {
        self.value_at(self.observations + periods_ahead - 1)
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}
