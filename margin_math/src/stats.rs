//! Descriptive statistics and serial-correlation tests

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Arithmetic mean of a non-empty slice
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot calculate mean of an empty series".to_string(),
        ));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Variance with `ddof` delta degrees of freedom (0 = population, 1 = sample)
pub fn variance(values: &[f64], ddof: usize) -> Result<f64> {
    if values.len() <= ddof {
        return Err(MathError::InsufficientData(format!(
            "Need more than {} observations for variance, got {}",
            ddof,
            values.len()
        )));
    }

    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Ok(ss / (values.len() - ddof) as f64)
}

/// Sample standard deviation
pub fn std_dev(values: &[f64]) -> Result<f64> {
    Ok(variance(values, 1)?.sqrt())
}

/// Minimum and maximum of a non-empty slice
pub fn min_max(values: &[f64]) -> Result<(f64, f64)> {
    let first = *values.first().ok_or_else(|| {
        MathError::InsufficientData("Cannot take min/max of an empty series".to_string())
    })?;

    Ok(values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

/// Quantile using linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be within [0, 1], got {}",
            q
        )));
    }
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot calculate quantile of an empty series".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Median of a non-empty slice
pub fn median(values: &[f64]) -> Result<f64> {
    quantile(values, 0.5)
}

/// Sample autocorrelation at the given lag
pub fn autocorrelation(values: &[f64], lag: usize) -> Result<f64> {
    if lag == 0 {
        return Ok(1.0);
    }
    if values.len() <= lag {
        return Err(MathError::InsufficientData(format!(
            "Autocorrelation at lag {} needs more than {} observations",
            lag, lag
        )));
    }

    let m = mean(values)?;
    let denominator: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denominator.abs() < 1e-12 {
        return Err(MathError::CalculationError(
            "Autocorrelation is undefined for a constant series".to_string(),
        ));
    }

    let numerator: f64 = (lag..values.len())
        .map(|t| (values[t] - m) * (values[t - lag] - m))
        .sum();

    Ok(numerator / denominator)
}

/// Result of a Ljung-Box portmanteau test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LjungBox {
    /// Number of lags tested
    pub lags: usize,
    /// Q statistic
    pub statistic: f64,
    /// Upper-tail probability under the chi-squared null
    pub p_value: f64,
}

impl LjungBox {
    /// Whether the series is consistent with white noise at the given significance level
    pub fn is_white_noise(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Ljung-Box test for serial correlation up to `lags`
pub fn ljung_box(values: &[f64], lags: usize) -> Result<LjungBox> {
    if lags == 0 {
        return Err(MathError::InvalidInput(
            "Ljung-Box needs at least one lag".to_string(),
        ));
    }
    if values.len() <= lags {
        return Err(MathError::InsufficientData(format!(
            "Ljung-Box with {} lags needs more than {} observations",
            lags, lags
        )));
    }

    let n = values.len() as f64;
    let mut statistic = 0.0;
    for k in 1..=lags {
        let r = autocorrelation(values, k)?;
        statistic += r * r / (n - k as f64);
    }
    statistic *= n * (n + 2.0);

    let chi = ChiSquared::new(lags as f64)
        .map_err(|e| MathError::CalculationError(format!("Chi-squared: {}", e)))?;

    Ok(LjungBox {
        lags,
        statistic,
        p_value: 1.0 - chi.cdf(statistic),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(variance(&values, 0).unwrap(), 4.0);
        assert_relative_eq!(std_dev(&values).unwrap(), (32.0f64 / 7.0).sqrt());
        assert!(mean(&[]).is_err());
        assert!(variance(&[1.0], 1).is_err());
    }

    #[test]
    fn test_quantiles() {
        let values = [3.0, 1.0, 4.0, 2.0];
        assert_relative_eq!(median(&values).unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 4.0);
        assert_relative_eq!(quantile(&values, 0.25).unwrap(), 1.75);
        assert!(quantile(&values, 1.5).is_err());
        assert_eq!(min_max(&values).unwrap(), (1.0, 4.0));
    }

    #[test]
    fn test_autocorrelation() {
        let alternating = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let r1 = autocorrelation(&alternating, 1).unwrap();
        assert!(r1 < -0.8);
        assert!(autocorrelation(&[3.0, 3.0, 3.0], 1).is_err());
    }

    #[test]
    fn test_ljung_box_detects_trend() {
        let trending: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let result = ljung_box(&trending, 5).unwrap();
        assert!(result.statistic > 0.0);
        assert!(!result.is_white_noise(0.05));
        assert!(ljung_box(&trending[..3], 5).is_err());
    }
}
