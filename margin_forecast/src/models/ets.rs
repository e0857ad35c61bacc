//! Exponential smoothing (ETS) models backed by augurs
//!
//! Each model wraps an [`AutoETS`] search restricted by a component spec:
//! `"ANN"` is simple exponential smoothing, `"AAN"` is Holt's linear trend
//! and `"ZZN"` lets the search pick error and trend components. Parameters
//! are estimated by augurs; this module only adapts its output to the
//! [`TrainedForecastModel`] interface.

use crate::error::{ForecastError, Result};
use crate::models::{require_observations, ForecastModel, ForecastResult, TrainedForecastModel};
use augurs::ets::{AutoETS, FittedAutoETS};
use augurs::{Fit, Predict};
use std::fmt;
use tracing::debug;

/// ETS model selected by augurs within a component spec
#[derive(Debug, Clone)]
pub struct EtsModel {
    id: String,
    name: String,
    spec: String,
    season_length: usize,
    min_observations: usize,
}

impl EtsModel {
    /// ETS search over a component spec such as `"AAN"` or `"ZZZ"`.
    ///
    /// Invalid specs are rejected here rather than on the first fit.
    pub fn new(id: &str, name: &str, season_length: usize, spec: &str) -> Result<Self> {
        if season_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "Season length must be positive".to_string(),
            ));
        }
        AutoETS::new(season_length, spec).map_err(|e| {
            ForecastError::InvalidParameter(format!("ETS spec '{}': {}", spec, e))
        })?;

        let seasonal = spec.chars().nth(2).map_or(false, |c| c != 'N');
        let base = if spec.chars().nth(1).map_or(false, |c| c != 'N') {
            10
        } else {
            8
        };

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            spec: spec.to_string(),
            season_length,
            min_observations: if seasonal {
                base.max(2 * season_length + 1)
            } else {
                base
            },
        })
    }

    /// Simple exponential smoothing (additive error, no trend)
    pub fn simple() -> Result<Self> {
        Self::new("ses", "Exponential Smoothing (ETS A,N,N)", 1, "ANN")
    }

    /// Holt's linear trend (additive error and trend)
    pub fn holt() -> Result<Self> {
        Self::new("holt", "Holt Linear Trend (ETS A,A,N)", 1, "AAN")
    }

    /// Non-seasonal ETS with error and trend chosen by information criterion
    pub fn auto() -> Result<Self> {
        Self::new("ets", "Auto ETS (Z,Z,N)", 1, "ZZN")
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }
}

impl ForecastModel for EtsModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_observations(&self) -> usize {
        self.min_observations
    }

    fn train(&self, data: &[f64]) -> Result<Box<dyn TrainedForecastModel>> {
        require_observations(data, self.min_observations, &self.name)?;

        let search = AutoETS::new(self.season_length, self.spec.as_str())
            .map_err(|e| ForecastError::ForecastingError(format!("ETS init: {}", e)))?;
        let fitted = search
            .fit(data)
            .map_err(|e| ForecastError::ForecastingError(format!("ETS fit: {}", e)))?;

        let in_sample = fitted
            .predict_in_sample(None::<f64>)
            .map_err(|e| ForecastError::ForecastingError(format!("ETS in-sample: {}", e)))?;
        if in_sample.point.len() != data.len() {
            return Err(ForecastError::ForecastingError(format!(
                "ETS returned {} in-sample values for {} observations",
                in_sample.point.len(),
                data.len()
            )));
        }

        debug!(
            model = %self.id,
            spec = %self.spec,
            observations = data.len(),
            "Fitted ETS"
        );

        Ok(Box::new(TrainedEtsModel {
            name: self.name.clone(),
            fitted_model: fitted,
            history: data.to_vec(),
            fitted: in_sample
                .point
                .into_iter()
                .map(|v| Some(v).filter(|v| v.is_finite()))
                .collect(),
        }))
    }
}

/// ETS model fitted by augurs
pub struct TrainedEtsModel {
    name: String,
    fitted_model: FittedAutoETS,
    history: Vec<f64>,
    fitted: Vec<Option<f64>>,
}

impl fmt::Debug for TrainedEtsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedEtsModel")
            .field("name", &self.name)
            .field("observations", &self.history.len())
            .finish()
    }
}

impl TrainedForecastModel for TrainedEtsModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let forecast = self
            .fitted_model
            .predict(horizon, None::<f64>)
            .map_err(|e| ForecastError::ForecastingError(format!("ETS predict: {}", e)))?;
        ForecastResult::new(forecast.point, horizon)
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
