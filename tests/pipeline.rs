use pretty_assertions::assert_eq;
use region_margin_workspace::config::{EtlConfig, ForecastConfig, PipelineConfig};
use region_margin_workspace::margin_etl::{Partition, TableStore, ZeroCostPolicy};
use region_margin_workspace::margin_forecast::SortMetric;
use region_margin_workspace::pipeline::{run_enrichment, run_forecast, run_trends};
use region_margin_workspace::PipelineError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Two years of monthly rows for two regions and two product lines
fn write_source_csv(path: &Path) {
    let mut content = String::from("Region,Product Line,Month,Cost (M$),Revevue (M$)\n");
    for t in 0..24u32 {
        let (year, month) = (2022 + t / 12, t % 12 + 1);
        for (r, region) in ["us-east1", "us-west1"].iter().enumerate() {
            for (p, line) in ["Jobs", "SQL"].iter().enumerate() {
                let cost = 10.0 + r as f64 + p as f64 * 2.0;
                let margin = 0.10 + 0.002 * t as f64 + 0.03 * ((t + r as u32 * 3) as f64 / 2.0).sin();
                content.push_str(&format!(
                    "{},{},{}-{:02}-01,{:.4},{:.4}\n",
                    region,
                    line,
                    year,
                    month,
                    cost,
                    cost * (1.0 + margin)
                ));
            }
        }
    }
    fs::write(path, content).unwrap();
}

fn create_config(dir: &TempDir) -> PipelineConfig {
    let input = dir.path().join("data.csv");
    write_source_csv(&input);

    PipelineConfig {
        etl: EtlConfig {
            input,
            warehouse: dir.path().join("warehouse"),
            trends_dir: Some(dir.path().join("trends")),
            ..EtlConfig::default()
        },
        forecast: ForecastConfig {
            output_dir: dir.path().join("reports"),
            simulations: 100,
            ..ForecastConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_enrichment_overwrites_table() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);

    let first = run_enrichment(&config.etl).unwrap();
    assert_eq!(first.rows, 96);
    assert!(first
        .table_path
        .ends_with("region_margin/part-00000.parquet"));
    assert_eq!(first.profile.regions, vec!["us-east1", "us-west1"]);

    let store = TableStore::new(&config.etl.warehouse);
    let before = store.read("region_margin").unwrap().records().unwrap();

    run_enrichment(&config.etl).unwrap();
    let after = store.read("region_margin").unwrap().records().unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_trends_are_exported() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    run_enrichment(&config.etl).unwrap();

    let outputs = run_trends(&config.etl).unwrap();
    let labels: Vec<&str> = outputs.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "global",
            "region",
            "product_line",
            "region_product_line",
            "combined"
        ]
    );

    for output in &outputs {
        assert_eq!(output.view.len(), 96);
        assert!(output.export.as_ref().unwrap().exists());
    }

    let region = &outputs[1];
    let rows = region.view.records().unwrap();
    let first_west = rows
        .iter()
        .find(|r| r.record.region == "us-west1")
        .unwrap();
    assert_eq!(first_west.change(Partition::Region).unwrap().lag, None);
}

#[test]
fn test_trends_need_a_stored_table() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    assert!(matches!(
        run_trends(&config.etl),
        Err(PipelineError::EtlError(_))
    ));
}

#[test]
fn test_forecast_stage() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    run_enrichment(&config.etl).unwrap();

    let report = run_forecast(&config.etl, &config.forecast).unwrap();

    assert_eq!(report.stats.length, 24);
    assert!(!report.leaderboard.is_empty());
    assert_eq!(report.leaderboard.best().unwrap().id, report.best_model);
    assert_eq!(report.holdout.predicted.len(), 3);
    assert_eq!(report.forecast.values().len(), 3);

    let requested = &report.requested_forecast;
    assert_eq!(requested.values().len(), 5);
    let months: Vec<String> = requested
        .months()
        .unwrap()
        .iter()
        .map(|m| m.to_string())
        .collect();
    assert_eq!(
        months,
        vec!["2024-01-01", "2024-02-01", "2024-03-01", "2024-04-01", "2024-05-01"]
    );

    assert_eq!(report.files.len(), 7);
    for file in &report.files {
        let content = fs::read_to_string(file).unwrap();
        serde_json::from_str::<serde_json::Value>(&content).unwrap();
    }
}

#[test]
fn test_config_from_toml() {
    let config = PipelineConfig::from_toml_str(
        r#"
        [etl]
        input = "other.csv"
        zero_cost = "reject"
        partitions = ["region", "region_product_line"]

        [forecast]
        fh = 4
        sort_metric = "rmse"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.etl.input.to_str(), Some("other.csv"));
    assert_eq!(config.etl.zero_cost, ZeroCostPolicy::Reject);
    assert_eq!(
        config.etl.partitions,
        vec![Partition::Region, Partition::RegionProductLine]
    );
    assert_eq!(config.etl.table, "region_margin");
    assert_eq!(config.forecast.fh, 4);
    assert_eq!(config.forecast.sort_metric, SortMetric::Rmse);
    assert_eq!(config.forecast.session_id, 123);
    assert_eq!(config.forecast.predict_horizon, 5);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_config_defaults_and_validation() {
    let config = PipelineConfig::from_toml_str("").unwrap();
    assert_eq!(config, PipelineConfig::default());
    assert_eq!(config.forecast.extended_horizon, 36);
    assert_eq!(config.forecast.experiment().fh, 3);

    assert!(matches!(
        PipelineConfig::from_toml_str("[forecast]\nfh = 0"),
        Err(PipelineError::ForecastError(_))
    ));
    assert!(matches!(
        PipelineConfig::from_toml_str("[etl]\nzero_cost = \"skip\""),
        Err(PipelineError::ConfigError(_))
    ));
    assert!(PipelineConfig::load(Some(Path::new("missing.toml"))).is_err());
}

#[test]
fn test_shipped_config_parses() {
    let config = PipelineConfig::from_file("config/region_margin.toml").unwrap();
    assert_eq!(config.etl.input.to_str(), Some("data/data.csv"));
    assert_eq!(config.forecast.experiment(), ForecastConfig::default().experiment());
}
