use chrono::NaiveDate;
use margin_forecast::models::naive::{Drift, GrandMean, Naive};
use margin_forecast::{
    Experiment, ExperimentConfig, ForecastError, ForecastModel, Leaderboard, LeaderboardEntry,
    MonthlySeries, SortMetric,
};
use margin_math::AccuracyMetrics;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn create_series(len: usize, value: impl Fn(usize) -> f64) -> MonthlySeries {
    let mut months = Vec::with_capacity(len);
    let mut current = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    for _ in 0..len {
        months.push(current);
        current = margin_forecast::series::next_month(current).unwrap();
    }
    MonthlySeries::new(months, (0..len).map(value).collect()).unwrap()
}

fn seasonal_margins(len: usize) -> MonthlySeries {
    create_series(len, |t| {
        0.12 + 0.002 * t as f64 + 0.03 * (t as f64 * std::f64::consts::PI / 6.0).sin()
    })
}

fn metrics(mase: f64) -> AccuracyMetrics {
    AccuracyMetrics {
        mase,
        rmsse: mase,
        mae: 0.1,
        mse: 0.01,
        rmse: 0.1,
        mape: 0.1,
        smape: 0.1,
        r2: 0.5,
    }
}

fn entry(id: &str, mase: f64) -> LeaderboardEntry {
    LeaderboardEntry {
        id: id.to_string(),
        name: id.to_string(),
        folds: 3,
        metrics: metrics(mase),
    }
}

#[test]
fn test_setup_requires_history() {
    let result = Experiment::setup(seasonal_margins(5), ExperimentConfig::default());
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));

    let config = ExperimentConfig {
        fh: 0,
        ..ExperimentConfig::default()
    };
    assert!(Experiment::setup(seasonal_margins(24), config).is_err());
}

#[test]
fn test_setup_holds_out_last_fh_months() {
    let experiment = Experiment::setup(seasonal_margins(24), ExperimentConfig::default()).unwrap();

    assert_eq!(experiment.train().len(), 21);
    assert_eq!(experiment.holdout().len(), 3);
    assert_eq!(
        experiment.holdout().first_month(),
        NaiveDate::from_ymd_opt(2023, 10, 1).unwrap()
    );
    assert_eq!(experiment.candidate_ids().len(), 9);
}

#[test]
fn test_compare_models_ranks_by_metric() {
    let experiment = Experiment::setup(seasonal_margins(24), ExperimentConfig::default()).unwrap();
    let board = experiment.compare_models().unwrap();

    assert!(!board.is_empty());
    assert_eq!(board.metric(), SortMetric::Mase);

    let scores: Vec<f64> = board
        .entries()
        .iter()
        .map(|e| e.metrics.mase)
        .filter(|v| !v.is_nan())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] <= w[1]));

    let ids = experiment.candidate_ids();
    for entry in board.entries() {
        assert!(ids.contains(&entry.id.as_str()));
        assert!(entry.folds >= 1 && entry.folds <= 3);
    }
}

#[test]
fn test_linear_series_is_forecast_exactly() {
    let series = create_series(24, |t| 0.05 + 0.01 * t as f64);
    let experiment = Experiment::setup(series, ExperimentConfig::default()).unwrap();

    let board = experiment.compare_models().unwrap();
    let best = board.best().unwrap();
    assert!(best.metrics.mase < 1e-6, "{}", board);
}

#[test]
fn test_folds_shrink_with_short_history() {
    let experiment = Experiment::setup(seasonal_margins(9), ExperimentConfig::default()).unwrap();
    let board = experiment.compare_models().unwrap();

    assert!(board.entries().iter().all(|e| e.folds == 1));
    assert!(board.entries().iter().all(|e| e.id != "snaive"));
}

#[test]
fn test_no_room_for_a_fold() {
    let experiment = Experiment::setup(seasonal_margins(6), ExperimentConfig::default()).unwrap();
    assert!(matches!(
        experiment.compare_models(),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_predict_returns_requested_months() {
    let series = seasonal_margins(24);
    let expected_months = series.future_months(5).unwrap();
    let experiment = Experiment::setup(series, ExperimentConfig::default()).unwrap();

    let board = experiment.compare_models().unwrap();
    let best = experiment.select_best(&board).unwrap();
    let final_model = experiment.finalize(&best).unwrap();
    assert_eq!(final_model.observations(), 24);

    let forecast = experiment.predict(&final_model, 5).unwrap();
    assert_eq!(forecast.values().len(), 5);
    assert_eq!(forecast.months().unwrap(), expected_months.as_slice());
    assert_eq!(
        forecast.months().unwrap()[0],
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    );

    let intervals = forecast.intervals().unwrap();
    assert_eq!(intervals.len(), 5);
    assert!(intervals.iter().all(|(lower, upper)| lower <= upper));

    // a model trained on the training part is refit before predicting
    let refit = experiment.predict(&best, 3).unwrap();
    assert_eq!(refit.values().len(), 3);
    assert!(experiment.predict(&best, 0).is_err());
}

#[test]
fn test_predict_holdout() {
    let experiment = Experiment::setup(seasonal_margins(24), ExperimentConfig::default())
        .unwrap()
        .with_candidates(vec![Box::new(Naive::new()) as Box<dyn ForecastModel>])
        .unwrap();

    let model = experiment.create_model("naive").unwrap();
    let holdout = experiment.predict_holdout(&model).unwrap();

    assert_eq!(holdout.months, experiment.holdout().months().to_vec());
    assert_eq!(holdout.actual, experiment.holdout().values().to_vec());
    let last_train = experiment.train().values()[20];
    assert_eq!(holdout.predicted, vec![last_train; 3]);
    assert!(holdout.metrics.mae >= 0.0);

    let final_model = experiment.finalize(&model).unwrap();
    assert!(matches!(
        experiment.predict_holdout(&final_model),
        Err(ForecastError::ValidationError(_))
    ));
    assert!(experiment.create_model("prophet").is_err());
}

#[test]
fn test_model_from_another_experiment_is_rejected() {
    let full = Experiment::setup(seasonal_margins(24), ExperimentConfig::default()).unwrap();
    let sma = full.create_model("sma").unwrap();
    let grand_mean = full.create_model("grand_mean").unwrap();

    let small = Experiment::setup(seasonal_margins(24), ExperimentConfig::default())
        .unwrap()
        .with_candidates(vec![
            Box::new(Naive::new()) as Box<dyn ForecastModel>,
            Box::new(Drift::new()) as Box<dyn ForecastModel>,
        ])
        .unwrap();

    // index past the end of the smaller candidate set
    assert!(matches!(
        small.finalize(&sma),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        small.predict(&sma, 3),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(small.plot_forecast(&sma, 12).is_err());

    // same index, different model
    assert!(matches!(
        small.finalize(&grand_mean),
        Err(ForecastError::InvalidParameter(_))
    ));

    let same = Experiment::setup(seasonal_margins(24), ExperimentConfig::default())
        .unwrap()
        .with_candidates(vec![
            Box::new(Naive::new()) as Box<dyn ForecastModel>,
            Box::new(GrandMean::new()) as Box<dyn ForecastModel>,
        ])
        .unwrap();
    assert_eq!(same.finalize(&grand_mean).unwrap().observations(), 24);
}

#[test]
fn test_intervals_are_reproducible() {
    let run = || {
        let experiment = Experiment::setup(seasonal_margins(24), ExperimentConfig::default())
            .unwrap()
            .with_candidates(vec![Box::new(Drift::new()) as Box<dyn ForecastModel>])
            .unwrap();
        let model = experiment.create_model("drift").unwrap();
        experiment
            .predict(&model, 4)
            .unwrap()
            .intervals()
            .unwrap()
            .to_vec()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_plots() {
    let experiment = Experiment::setup(seasonal_margins(24), ExperimentConfig::default()).unwrap();
    let board = experiment.compare_models().unwrap();
    let best = experiment.select_best(&board).unwrap();

    let forecast_plot = experiment.plot_forecast(&best, 36).unwrap();
    assert_eq!(forecast_plot.points.len(), 24 + 36);
    assert_eq!(forecast_plot.forecast_points().count(), 36);
    assert_eq!(forecast_plot.points[0].actual, Some(experiment.series().values()[0]));

    let residual_plot = experiment.plot_residuals(&best).unwrap();
    assert_eq!(residual_plot.points.len(), 21);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plots").join("residuals.json");
    residual_plot.write_json(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["points"].as_array().unwrap().len(), 21);
    assert_eq!(json["model"], serde_json::json!(best.name()));
}

#[test]
fn test_check_stats() {
    let experiment = Experiment::setup(seasonal_margins(24), ExperimentConfig::default()).unwrap();
    let stats = experiment.check_stats().unwrap();

    assert_eq!(stats.length, 24);
    assert_eq!(stats.first_month, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
    assert_eq!(stats.last_month, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
    assert!(stats.min <= stats.mean && stats.mean <= stats.max);
    assert!(stats.ljung_box.is_some());
    assert!(stats.to_string().contains("Ljung-Box"));
}

#[test]
fn test_leaderboard_nan_last_and_stable() {
    let board = Leaderboard::new(
        SortMetric::Mase,
        vec![
            entry("a", f64::NAN),
            entry("b", 0.8),
            entry("c", 0.5),
            entry("d", 0.8),
        ],
    );

    let ids: Vec<&str> = board.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "d", "a"]);
    assert_eq!(board.best().unwrap().id, "c");
}

#[rstest]
#[case("mase", SortMetric::Mase)]
#[case("RMSSE", SortMetric::Rmsse)]
#[case("smape", SortMetric::Smape)]
#[case("r2", SortMetric::R2)]
fn test_sort_metric_parsing(#[case] raw: &str, #[case] expected: SortMetric) {
    assert_eq!(raw.parse::<SortMetric>().unwrap(), expected);
    assert_eq!(expected.to_string().parse::<SortMetric>().unwrap(), expected);
}

#[test]
fn test_r2_ranks_higher_first() {
    let mut low = entry("low", 0.1);
    low.metrics.r2 = 0.2;
    let mut high = entry("high", 0.9);
    high.metrics.r2 = 0.9;

    let board = Leaderboard::new(SortMetric::R2, vec![low, high]);
    assert_eq!(board.best().unwrap().id, "high");
}

#[test]
fn test_empty_candidate_set() {
    let experiment = Experiment::setup(seasonal_margins(24), ExperimentConfig::default()).unwrap();
    assert!(experiment.with_candidates(Vec::new()).is_err());
}
