//! Reproducible forecasting experiment over a monthly series
//!
//! The last `fh` observations are held out. Candidates are ranked by
//! expanding-window cross-validation on the rest, the best one is refit and
//! used for holdout predictions, future predictions and plots.

use crate::error::{ForecastError, Result};
use crate::intervals::Bootstrap;
use crate::models::{default_candidates, ForecastModel, ForecastResult, TrainedForecastModel};
use crate::plots::{residual_lags, ForecastPlot, ResidualPlot};
use crate::series::MonthlySeries;
use chrono::NaiveDate;
use margin_math::{forecast_accuracy, ljung_box, stats, AccuracyMetrics, LjungBox};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Fewest observations a cross-validation window trains on
pub const MIN_TRAINING: usize = 3;

/// Metric used to rank candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMetric {
    #[default]
    Mase,
    Rmsse,
    Mae,
    Rmse,
    Mape,
    Smape,
    R2,
}

impl SortMetric {
    pub fn value(&self, metrics: &AccuracyMetrics) -> f64 {
        match self {
            SortMetric::Mase => metrics.mase,
            SortMetric::Rmsse => metrics.rmsse,
            SortMetric::Mae => metrics.mae,
            SortMetric::Rmse => metrics.rmse,
            SortMetric::Mape => metrics.mape,
            SortMetric::Smape => metrics.smape,
            SortMetric::R2 => metrics.r2,
        }
    }

    pub fn higher_is_better(&self) -> bool {
        matches!(self, SortMetric::R2)
    }

    /// Ranking order of two metric values; NaN ranks last
    fn compare(&self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if self.higher_is_better() => b.total_cmp(&a),
            (false, false) => a.total_cmp(&b),
        }
    }
}

impl fmt::Display for SortMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortMetric::Mase => "MASE",
            SortMetric::Rmsse => "RMSSE",
            SortMetric::Mae => "MAE",
            SortMetric::Rmse => "RMSE",
            SortMetric::Mape => "MAPE",
            SortMetric::Smape => "SMAPE",
            SortMetric::R2 => "R2",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SortMetric {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mase" => Ok(SortMetric::Mase),
            "rmsse" => Ok(SortMetric::Rmsse),
            "mae" => Ok(SortMetric::Mae),
            "rmse" => Ok(SortMetric::Rmse),
            "mape" => Ok(SortMetric::Mape),
            "smape" => Ok(SortMetric::Smape),
            "r2" => Ok(SortMetric::R2),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown sort metric '{}'",
                other
            ))),
        }
    }
}

/// Experiment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Forecast horizon; also the holdout and fold length
    pub fh: usize,
    /// Seed for every random draw of the experiment
    pub session_id: u64,
    /// Cross-validation folds requested
    pub folds: usize,
    pub sort_metric: SortMetric,
    /// Prediction interval coverage
    pub coverage: f64,
    /// Bootstrap paths per interval
    pub simulations: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            fh: 3,
            session_id: 123,
            folds: 3,
            sort_metric: SortMetric::Mase,
            coverage: 0.9,
            simulations: 500,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fh == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be positive".to_string(),
            ));
        }
        if self.folds == 0 {
            return Err(ForecastError::InvalidParameter(
                "At least one cross-validation fold is required".to_string(),
            ));
        }
        self.bootstrap().validate()
    }

    fn bootstrap(&self) -> Bootstrap {
        Bootstrap {
            coverage: self.coverage,
            simulations: self.simulations,
            seed: self.session_id,
        }
    }
}

/// Descriptive statistics of the forecast input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub length: usize,
    pub first_month: NaiveDate,
    pub last_month: NaiveDate,
    pub mean: f64,
    pub median: f64,
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub lag1_autocorrelation: Option<f64>,
    pub ljung_box: Option<LjungBox>,
}

impl fmt::Display for SeriesStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Series Statistics:")?;
        writeln!(
            f,
            "  Length:  {} ({} .. {})",
            self.length, self.first_month, self.last_month
        )?;
        writeln!(f, "  Mean:    {:.4}", self.mean)?;
        writeln!(f, "  Median:  {:.4}", self.median)?;
        if let Some(std_dev) = self.std_dev {
            writeln!(f, "  Std Dev: {:.4}", std_dev)?;
        }
        writeln!(f, "  Range:   {:.4} .. {:.4}", self.min, self.max)?;
        if let Some(acf) = self.lag1_autocorrelation {
            writeln!(f, "  ACF(1):  {:.4}", acf)?;
        }
        if let Some(test) = &self.ljung_box {
            writeln!(
                f,
                "  Ljung-Box({}): Q = {:.4}, p = {:.4} ({})",
                test.lags,
                test.statistic,
                test.p_value,
                if test.is_white_noise(0.05) {
                    "white noise"
                } else {
                    "autocorrelated"
                }
            )?;
        }
        Ok(())
    }
}

/// Cross-validated score of one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    /// Folds the candidate could be fitted on
    pub folds: usize,
    pub metrics: AccuracyMetrics,
}

/// Candidates ranked by the sort metric, best first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    metric: SortMetric,
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Rank entries; ties and NaN scores keep their given order
    pub fn new(metric: SortMetric, mut entries: Vec<LeaderboardEntry>) -> Self {
        entries.sort_by(|a, b| metric.compare(metric.value(&a.metrics), metric.value(&b.metrics)));
        Self { metric, entries }
    }

    pub fn metric(&self) -> SortMetric {
        self.metric
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn best(&self) -> Option<&LeaderboardEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model comparison (sorted by {}):", self.metric)?;
        writeln!(
            f,
            "  {:<12} {:<38} {:>5} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "id", "model", "folds", "MASE", "RMSSE", "MAE", "RMSE", "MAPE", "SMAPE", "R2"
        )?;
        for e in &self.entries {
            let m = &e.metrics;
            writeln!(
                f,
                "  {:<12} {:<38} {:>5} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
                e.id, e.name, e.folds, m.mase, m.rmsse, m.mae, m.rmse, m.mape, m.smape, m.r2
            )?;
        }
        Ok(())
    }
}

/// A candidate trained on part or all of the experiment's series
#[derive(Debug)]
pub struct FittedModel {
    candidate: usize,
    id: String,
    name: String,
    trained: Box<dyn TrainedForecastModel>,
}

impl FittedModel {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trained(&self) -> &dyn TrainedForecastModel {
        self.trained.as_ref()
    }

    /// Number of observations the model was trained on
    pub fn observations(&self) -> usize {
        self.trained.history().len()
    }
}

/// Predictions for the held-out months next to what was observed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldoutPrediction {
    pub model: String,
    pub months: Vec<NaiveDate>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
    pub intervals: Option<Vec<(f64, f64)>>,
    pub metrics: AccuracyMetrics,
}

impl fmt::Display for HoldoutPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Holdout predictions ({}):", self.model)?;
        writeln!(f, "  {:<12} {:>10} {:>10}", "month", "actual", "predicted")?;
        for ((month, actual), predicted) in self.months.iter().zip(&self.actual).zip(&self.predicted)
        {
            writeln!(f, "  {:<12} {:>10.4} {:>10.4}", month, actual, predicted)?;
        }
        write!(f, "{}", self.metrics)
    }
}

/// A forecasting experiment: series, holdout split, candidates and settings
#[derive(Debug)]
pub struct Experiment {
    series: MonthlySeries,
    train: MonthlySeries,
    holdout: MonthlySeries,
    config: ExperimentConfig,
    candidates: Vec<Box<dyn ForecastModel>>,
}

impl Experiment {
    /// Set up an experiment with the default candidate set
    pub fn setup(series: MonthlySeries, config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        if series.len() < config.fh + MIN_TRAINING {
            return Err(ForecastError::InsufficientData(format!(
                "A horizon of {} needs at least {} observations, got {}",
                config.fh,
                config.fh + MIN_TRAINING,
                series.len()
            )));
        }

        let (train, holdout) = series.train_test_split(config.fh)?;
        info!(
            observations = series.len(),
            train = train.len(),
            holdout = holdout.len(),
            fh = config.fh,
            session_id = config.session_id,
            "Set up forecasting experiment"
        );

        Ok(Self {
            series,
            train,
            holdout,
            config,
            candidates: default_candidates()?,
        })
    }

    /// Replace the candidate set
    pub fn with_candidates(mut self, candidates: Vec<Box<dyn ForecastModel>>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one candidate model is required".to_string(),
            ));
        }
        self.candidates = candidates;
        Ok(self)
    }

    pub fn series(&self) -> &MonthlySeries {
        &self.series
    }

    pub fn train(&self) -> &MonthlySeries {
        &self.train
    }

    pub fn holdout(&self) -> &MonthlySeries {
        &self.holdout
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Identifiers of the candidates, in tie order
    pub fn candidate_ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.id()).collect()
    }

    /// Descriptive statistics and a white-noise test of the whole series
    pub fn check_stats(&self) -> Result<SeriesStats> {
        let values = self.series.values();
        let (min, max) = stats::min_max(values)?;

        Ok(SeriesStats {
            length: values.len(),
            first_month: self.series.first_month(),
            last_month: self.series.last_month(),
            mean: stats::mean(values)?,
            median: stats::median(values)?,
            std_dev: stats::std_dev(values).ok(),
            min,
            max,
            lag1_autocorrelation: stats::autocorrelation(values, 1).ok(),
            ljung_box: ljung_box(values, residual_lags(values.len())).ok(),
        })
    }

    /// Training cutoffs of the cross-validation folds, oldest first
    fn fold_cutoffs(&self) -> Result<Vec<usize>> {
        let fh = self.config.fh;
        let train_len = self.train.len();
        let available = train_len.saturating_sub(MIN_TRAINING) / fh;
        if available == 0 {
            return Err(ForecastError::InsufficientData(format!(
                "{} training observations leave no room for a {}-month fold",
                train_len, fh
            )));
        }

        let folds = self.config.folds.min(available);
        if folds < self.config.folds {
            warn!(
                requested = self.config.folds,
                used = folds,
                "Not enough history for every fold; using fewer"
            );
        }

        Ok((0..folds).map(|k| train_len - (folds - k) * fh).collect())
    }

    /// Score every candidate by expanding-window cross-validation on the
    /// training part and rank them by the configured metric
    pub fn compare_models(&self) -> Result<Leaderboard> {
        let cutoffs = self.fold_cutoffs()?;
        let values = self.train.values();
        let fh = self.config.fh;

        let mut entries = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            let mut fold_metrics = Vec::with_capacity(cutoffs.len());
            for &cutoff in &cutoffs {
                if cutoff < candidate.min_observations() {
                    continue;
                }
                let history = &values[..cutoff];
                let actual = &values[cutoff..cutoff + fh];

                let scored = candidate
                    .train(history)
                    .and_then(|trained| trained.forecast(fh))
                    .and_then(|forecast| {
                        forecast_accuracy(forecast.values(), actual, history)
                            .map_err(ForecastError::from)
                    });
                match scored {
                    Ok(metrics) => fold_metrics.push(metrics),
                    Err(err) => {
                        debug!(model = candidate.id(), cutoff, error = %err, "Skipped fold")
                    }
                }
            }

            if fold_metrics.is_empty() {
                warn!(model = candidate.id(), "Candidate could not be fitted on any fold");
                continue;
            }

            entries.push(LeaderboardEntry {
                id: candidate.id().to_string(),
                name: candidate.name().to_string(),
                folds: fold_metrics.len(),
                metrics: AccuracyMetrics::average(&fold_metrics)?,
            });
        }

        if entries.is_empty() {
            return Err(ForecastError::ForecastingError(
                "No candidate model could be fitted".to_string(),
            ));
        }

        let board = Leaderboard::new(self.config.sort_metric, entries);
        if let Some(best) = board.best() {
            info!(
                model = %best.id,
                metric = %board.metric(),
                score = board.metric().value(&best.metrics),
                candidates = board.len(),
                "Compared models"
            );
        }
        Ok(board)
    }

    fn fit(&self, candidate: usize, data: &[f64]) -> Result<FittedModel> {
        let model = self.candidates.get(candidate).ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "Candidate {} is not part of this experiment",
                candidate
            ))
        })?;
        Ok(FittedModel {
            candidate,
            id: model.id().to_string(),
            name: model.name().to_string(),
            trained: model.train(data)?,
        })
    }

    /// Train a candidate on the training part (everything but the holdout)
    pub fn create_model(&self, id: &str) -> Result<FittedModel> {
        let candidate = self
            .candidates
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| ForecastError::InvalidParameter(format!("Unknown model '{}'", id)))?;
        self.fit(candidate, self.train.values())
    }

    /// Train the leaderboard's top candidate on the training part
    pub fn select_best(&self, board: &Leaderboard) -> Result<FittedModel> {
        let best = board.best().ok_or_else(|| {
            ForecastError::ForecastingError("Empty leaderboard".to_string())
        })?;
        self.create_model(&best.id)
    }

    /// Refit a model's candidate on the whole series
    pub fn finalize(&self, model: &FittedModel) -> Result<FittedModel> {
        let matches = self
            .candidates
            .get(model.candidate)
            .map_or(false, |c| c.id() == model.id());
        if !matches {
            return Err(ForecastError::InvalidParameter(format!(
                "Model '{}' was not created by this experiment",
                model.id()
            )));
        }
        self.fit(model.candidate, self.series.values())
    }

    fn with_intervals(
        &self,
        trained: &dyn TrainedForecastModel,
        forecast: ForecastResult,
    ) -> Result<ForecastResult> {
        let residuals: Vec<f64> = trained
            .residuals()
            .into_iter()
            .flatten()
            .filter(|r| r.is_finite())
            .collect();
        if residuals.is_empty() {
            warn!(model = trained.name(), "No in-sample residuals; intervals omitted");
            return Ok(forecast);
        }

        let intervals = self
            .config
            .bootstrap()
            .intervals(forecast.values(), &residuals)?;
        forecast.with_intervals(intervals)
    }

    /// Predict the held-out months with a model trained on the training part
    pub fn predict_holdout(&self, model: &FittedModel) -> Result<HoldoutPrediction> {
        if model.observations() != self.train.len() {
            return Err(ForecastError::ValidationError(format!(
                "Holdout predictions need a model trained on the {} training observations, got {}",
                self.train.len(),
                model.observations()
            )));
        }

        let fh = self.holdout.len();
        let forecast = self.with_intervals(model.trained(), model.trained().forecast(fh)?)?;
        let metrics = forecast_accuracy(
            forecast.values(),
            self.holdout.values(),
            self.train.values(),
        )?;

        Ok(HoldoutPrediction {
            model: model.name().to_string(),
            months: self.holdout.months().to_vec(),
            actual: self.holdout.values().to_vec(),
            predicted: forecast.values().to_vec(),
            intervals: forecast.intervals().map(<[(f64, f64)]>::to_vec),
            metrics,
        })
    }

    /// Predict the `horizon` months after the last observation.
    ///
    /// A model trained on less than the whole series is refit first.
    pub fn predict(&self, model: &FittedModel, horizon: usize) -> Result<ForecastResult> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Prediction horizon must be positive".to_string(),
            ));
        }

        let refit;
        let model = if model.observations() == self.series.len() {
            model
        } else {
            refit = self.finalize(model)?;
            &refit
        };

        let forecast = model.trained().forecast(horizon)?;
        let forecast = self
            .with_intervals(model.trained(), forecast)?
            .with_months(self.series.future_months(horizon)?)?;

        info!(
            model = model.id(),
            horizon,
            first = ?forecast.months().and_then(|m| m.first()),
            "Predicted future months"
        );
        Ok(forecast)
    }

    /// History, fitted values and a `horizon`-month forecast of the refit model
    pub fn plot_forecast(&self, model: &FittedModel, horizon: usize) -> Result<ForecastPlot> {
        let final_model = self.finalize(model)?;
        let forecast = self.predict(&final_model, horizon)?;
        ForecastPlot::new(
            final_model.name(),
            &self.series,
            final_model.trained(),
            &forecast,
        )
    }

    /// In-sample residuals of the model as given
    pub fn plot_residuals(&self, model: &FittedModel) -> Result<ResidualPlot> {
        ResidualPlot::new(model.name(), &self.series, model.trained())
    }
}
