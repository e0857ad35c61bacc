//! Prediction intervals from bootstrapped in-sample residuals

use crate::error::{ForecastError, Result};
use margin_math::stats;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Settings for residual bootstrap intervals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bootstrap {
    /// Share of simulated paths inside the interval, in (0, 1)
    pub coverage: f64,
    /// Number of simulated paths
    pub simulations: usize,
    /// RNG seed; equal seeds give equal intervals
    pub seed: u64,
}

impl Bootstrap {
    pub fn validate(&self) -> Result<()> {
        if self.coverage <= 0.0 || self.coverage >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Coverage must be between 0 and 1".to_string(),
            ));
        }
        if self.simulations == 0 {
            return Err(ForecastError::InvalidParameter(
                "At least one simulation is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval around each point forecast.
    ///
    /// Each simulated path adds an accumulating sum of residuals drawn with
    /// replacement, so intervals widen with the horizon.
    pub fn intervals(&self, point: &[f64], residuals: &[f64]) -> Result<Vec<(f64, f64)>> {
        self.validate()?;
        if residuals.is_empty() {
            return Err(ForecastError::InsufficientData(
                "No residuals to bootstrap".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut paths: Vec<Vec<f64>> = vec![Vec::with_capacity(self.simulations); point.len()];

        for _ in 0..self.simulations {
            let mut accumulated = 0.0;
            for (step, value) in point.iter().enumerate() {
                accumulated += residuals[rng.gen_range(0..residuals.len())];
                paths[step].push(value + accumulated);
            }
        }

        let lower_q = (1.0 - self.coverage) / 2.0;
        let upper_q = 1.0 - lower_q;
        paths
            .iter()
            .map(|simulated| {
                Ok((
                    stats::quantile(simulated, lower_q)?,
                    stats::quantile(simulated, upper_q)?,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap(seed: u64) -> Bootstrap {
        Bootstrap {
            coverage: 0.9,
            simulations: 200,
            seed,
        }
    }

    #[test]
    fn test_intervals_contain_point_and_widen() {
        let residuals = [-0.2, -0.1, 0.0, 0.1, 0.2];
        let intervals = bootstrap(123).intervals(&[1.0, 1.0, 1.0], &residuals).unwrap();

        assert_eq!(intervals.len(), 3);
        for (lower, upper) in &intervals {
            assert!(*lower <= 1.0 && *upper >= 1.0);
        }
        let width = |i: usize| intervals[i].1 - intervals[i].0;
        assert!(width(2) >= width(0));
    }

    #[test]
    fn test_seed_reproducibility() {
        let residuals = [-0.3, 0.05, 0.1, 0.15];
        let first = bootstrap(7).intervals(&[0.5, 0.6], &residuals).unwrap();
        let second = bootstrap(7).intervals(&[0.5, 0.6], &residuals).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = bootstrap(1);
        settings.coverage = 1.0;
        assert!(settings.intervals(&[1.0], &[0.1]).is_err());
        assert!(bootstrap(1).intervals(&[1.0], &[]).is_err());
    }
}
