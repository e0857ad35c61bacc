//! Forecast accuracy metrics

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accuracy of a forecast against the observed values.
///
/// Percentage errors (`mape`, `smape`) are fractions, not percents. Metrics that
/// are undefined for the given data (for example MASE on a flat training
/// window) are `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Scaled Error
    pub mase: f64,
    /// Root Mean Squared Scaled Error
    pub rmsse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Coefficient of determination
    pub r2: f64,
}

impl AccuracyMetrics {
    /// Average a set of metrics field by field, ignoring NaN entries per field
    pub fn average(metrics: &[AccuracyMetrics]) -> Result<AccuracyMetrics> {
        if metrics.is_empty() {
            return Err(MathError::InsufficientData(
                "No metrics to average".to_string(),
            ));
        }

        let avg = |f: fn(&AccuracyMetrics) -> f64| {
            let finite: Vec<f64> = metrics.iter().map(f).filter(|v| v.is_finite()).collect();
            if finite.is_empty() {
                f64::NAN
            } else {
                finite.iter().sum::<f64>() / finite.len() as f64
            }
        };

        Ok(AccuracyMetrics {
            mase: avg(|m| m.mase),
            rmsse: avg(|m| m.rmsse),
            mae: avg(|m| m.mae),
            mse: avg(|m| m.mse),
            rmse: avg(|m| m.rmse),
            mape: avg(|m| m.mape),
            smape: avg(|m| m.smape),
            r2: avg(|m| m.r2),
        })
    }
}

impl fmt::Display for AccuracyMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MASE:  {:.4}", self.mase)?;
        writeln!(f, "  RMSSE: {:.4}", self.rmsse)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}", self.smape)?;
        writeln!(f, "  R2:    {:.4}", self.r2)?;
        Ok(())
    }
}

/// Calculate accuracy metrics for a forecast vs actual values.
///
/// `training` is the history the forecast was produced from; it provides the
/// in-sample naive error that scales MASE and RMSSE.
pub fn forecast_accuracy(
    forecast: &[f64],
    actual: &[f64],
    training: &[f64],
) -> Result<AccuracyMetrics> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(MathError::InvalidInput(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    let percentage: Vec<f64> = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| e.abs() / a.abs())
        .collect();
    let mape = if percentage.is_empty() {
        f64::NAN
    } else {
        percentage.iter().sum::<f64>() / percentage.len() as f64
    };

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let denominator = a.abs() + f.abs();
            if denominator == 0.0 {
                0.0
            } else {
                2.0 * (a - f).abs() / denominator
            }
        })
        .sum::<f64>()
        / n;

    let (mase, rmsse) = match naive_scales(training) {
        Some((abs_scale, sq_scale)) => (mae / abs_scale, (mse / sq_scale).sqrt()),
        None => (f64::NAN, f64::NAN),
    };

    let actual_mean = actual.iter().sum::<f64>() / n;
    let ss_total: f64 = actual.iter().map(|a| (a - actual_mean).powi(2)).sum();
    let r2 = if ss_total.abs() < 1e-12 {
        f64::NAN
    } else {
        1.0 - errors.iter().map(|e| e.powi(2)).sum::<f64>() / ss_total
    };

    Ok(AccuracyMetrics {
        mase,
        rmsse,
        mae,
        mse,
        rmse,
        mape,
        smape,
        r2,
    })
}

/// Mean absolute and mean squared one-step naive errors of the training history
fn naive_scales(training: &[f64]) -> Option<(f64, f64)> {
    if training.len() < 2 {
        return None;
    }

    let diffs: Vec<f64> = training.windows(2).map(|w| w[1] - w[0]).collect();
    let m = diffs.len() as f64;
    let abs_scale = diffs.iter().map(|d| d.abs()).sum::<f64>() / m;
    let sq_scale = diffs.iter().map(|d| d.powi(2)).sum::<f64>() / m;

    if abs_scale < 1e-12 {
        None
    } else {
        Some((abs_scale, sq_scale))
    }
}
