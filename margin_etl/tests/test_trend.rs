use approx::assert_relative_eq;
use chrono::NaiveDate;
use margin_etl::{
    compute_trend, compute_trends, MarginRecord, MarginTable, Partition, TrendRecord,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashMap;

fn month(m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, m, 1).unwrap()
}

fn record(region: &str, product_line: &str, m: u32, margin: f64) -> MarginRecord {
    // cost 100 and revenue chosen so the margin is exact
    MarginRecord::new(region, product_line, month(m), 100.0, 100.0 * (1.0 + margin))
}

/// Two regions, two product lines, three months, deliberately out of order
fn create_test_table() -> MarginTable {
    let records = vec![
        record("us-west1", "SQL", 2, 0.05),
        record("us-east1", "Jobs", 1, 0.25),
        record("us-west1", "Jobs", 1, 0.10),
        record("us-east1", "SQL", 3, 0.00),
        record("us-west1", "Jobs", 2, -0.05),
        record("us-east1", "Jobs", 2, 0.00),
        record("us-west1", "SQL", 1, -0.10),
        record("us-east1", "SQL", 1, 0.20),
        record("us-west1", "Jobs", 3, -0.02),
        record("us-east1", "Jobs", 3, -0.10),
        record("us-west1", "SQL", 3, 0.02),
        record("us-east1", "SQL", 2, 0.10),
    ];
    MarginTable::from_records(&records).unwrap()
}

fn partition_key(partition: Partition, r: &MarginRecord) -> String {
    match partition {
        Partition::Global => String::new(),
        Partition::Region => r.region.clone(),
        Partition::ProductLine => r.product_line.clone(),
        Partition::RegionProductLine => format!("{}/{}", r.region, r.product_line),
    }
}

/// Check lag/delta against the previous row of the same partition in view order
fn assert_lag_semantics(rows: &[TrendRecord], partition: Partition) {
    let mut previous: HashMap<String, (NaiveDate, f64)> = HashMap::new();

    for row in rows {
        let change = row.change(partition).unwrap();
        let margin = row.record.margin.unwrap();
        let key = partition_key(partition, &row.record);

        match previous.get(&key) {
            None => {
                assert_eq!(change.lag, None);
                assert_eq!(change.delta, None);
            }
            Some(&(prev_month, prev_margin)) => {
                assert!(prev_month <= row.record.month);
                assert_relative_eq!(change.lag.unwrap(), prev_margin, epsilon = 1e-12);
                assert_relative_eq!(change.delta.unwrap(), margin - prev_margin, epsilon = 1e-12);
            }
        }
        previous.insert(key, (row.record.month, margin));
    }
}

#[rstest]
#[case(Partition::Global)]
#[case(Partition::Region)]
#[case(Partition::ProductLine)]
#[case(Partition::RegionProductLine)]
fn test_lag_and_delta_per_partition(#[case] partition: Partition) {
    let table = create_test_table();
    let view = compute_trend(&table, partition).unwrap();

    assert_eq!(view.len(), table.len());
    assert_eq!(view.partitions(), &[partition]);
    assert_lag_semantics(&view.records().unwrap(), partition);
}

#[test]
fn test_region_example() {
    let table = create_test_table();
    let rows = compute_trend(&table, Partition::Region)
        .unwrap()
        .records()
        .unwrap();

    let west_jobs: Vec<&TrendRecord> = rows
        .iter()
        .filter(|r| r.record.region == "us-west1" && r.record.product_line == "Jobs")
        .collect();

    let region_view = compute_trend(&table, Partition::RegionProductLine)
        .unwrap()
        .records()
        .unwrap();
    let west_jobs_feb = region_view
        .iter()
        .find(|r| {
            r.record.region == "us-west1"
                && r.record.product_line == "Jobs"
                && r.record.month == month(2)
        })
        .unwrap();
    let change = west_jobs_feb.change(Partition::RegionProductLine).unwrap();
    assert_relative_eq!(change.lag.unwrap(), 0.10, epsilon = 1e-12);
    assert_relative_eq!(change.delta.unwrap(), -0.15, epsilon = 1e-12);

    // rows of a single region come out contiguous and month ordered
    assert_eq!(west_jobs.len(), 3);
    let regions: Vec<&str> = rows.iter().map(|r| r.record.region.as_str()).collect();
    assert_eq!(&regions[..6], &["us-east1"; 6]);
    assert_eq!(&regions[6..], &["us-west1"; 6]);
}

fn column_values(view: &margin_etl::TrendView, name: &str) -> Vec<Option<f64>> {
    view.dataframe()
        .column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn test_region_columns_with_one_product_line_per_region() {
    let table = MarginTable::from_records(&[
        record("us-west1", "Jobs", 2, -0.05),
        record("us-east1", "SQL", 1, 0.20),
        record("us-west1", "Jobs", 1, 0.10),
        record("us-east1", "SQL", 2, 0.25),
    ])
    .unwrap();
    let view = compute_trend(&table, Partition::Region).unwrap();

    let regions: Vec<String> = view
        .records()
        .unwrap()
        .iter()
        .map(|r| format!("{} {}", r.record.region, r.record.month))
        .collect();
    assert_eq!(
        regions,
        vec![
            "us-east1 2023-01-01",
            "us-east1 2023-02-01",
            "us-west1 2023-01-01",
            "us-west1 2023-02-01",
        ]
    );

    let lags = column_values(&view, "region_month_margin_mom_lag");
    let deltas = column_values(&view, "region_month_margin_mom");

    assert_eq!(lags[0], None);
    assert_eq!(deltas[0], None);
    assert_eq!(lags[2], None);
    assert_eq!(deltas[2], None);
    assert_relative_eq!(lags[1].unwrap(), 0.20, epsilon = 1e-12);
    assert_relative_eq!(deltas[1].unwrap(), 0.05, epsilon = 1e-12);
    assert_relative_eq!(lags[3].unwrap(), 0.10, epsilon = 1e-12);
    assert_relative_eq!(deltas[3].unwrap(), -0.15, epsilon = 1e-12);
}

#[test]
fn test_global_view_is_month_ordered_and_stable() {
    let table = create_test_table();
    let rows = compute_trend(&table, Partition::Global)
        .unwrap()
        .records()
        .unwrap();

    let months: Vec<NaiveDate> = rows.iter().map(|r| r.record.month).collect();
    let mut sorted = months.clone();
    sorted.sort();
    assert_eq!(months, sorted);

    // January rows keep their table order
    let january: Vec<(String, String)> = rows
        .iter()
        .filter(|r| r.record.month == month(1))
        .map(|r| (r.record.region.clone(), r.record.product_line.clone()))
        .collect();
    assert_eq!(
        january,
        vec![
            ("us-east1".to_string(), "Jobs".to_string()),
            ("us-west1".to_string(), "Jobs".to_string()),
            ("us-west1".to_string(), "SQL".to_string()),
            ("us-east1".to_string(), "SQL".to_string()),
        ]
    );

    let first = rows[0].change(Partition::Global).unwrap();
    assert_eq!(first.lag, None);
    assert_eq!(first.delta, None);
}

#[test]
fn test_combined_view_has_both_partitions() {
    let table = create_test_table();
    let view = compute_trends(
        &table,
        &[Partition::ProductLine, Partition::Region, Partition::Region],
    )
    .unwrap();

    assert_eq!(view.partitions(), &[Partition::ProductLine, Partition::Region]);
    for name in [
        "product_line_month_margin_mom_lag",
        "product_line_month_margin_mom",
        "region_month_margin_mom_lag",
        "region_month_margin_mom",
    ] {
        assert!(view.dataframe().column(name).is_ok(), "missing {}", name);
    }

    let rows = view.records().unwrap();
    assert_lag_semantics(&rows, Partition::ProductLine);
    assert_lag_semantics(&rows, Partition::Region);

    assert!(compute_trends(&table, &[]).is_err());
}

#[test]
fn test_recomputation_is_deterministic() {
    let table = create_test_table();
    let first = compute_trend(&table, Partition::ProductLine).unwrap().records().unwrap();
    let second = compute_trend(&table, Partition::ProductLine).unwrap().records().unwrap();
    assert_eq!(first, second);
}

#[rstest]
#[case(Partition::Global, "margin_mom_lag", "margin_mom")]
#[case(Partition::Region, "region_month_margin_mom_lag", "region_month_margin_mom")]
#[case(
    Partition::ProductLine,
    "product_line_month_margin_mom_lag",
    "product_line_month_margin_mom"
)]
#[case(
    Partition::RegionProductLine,
    "region_product_line_month_margin_mom_lag",
    "region_product_line_month_margin_mom"
)]
fn test_column_names(#[case] partition: Partition, #[case] lag: &str, #[case] delta: &str) {
    assert_eq!(partition.lag_column(), lag);
    assert_eq!(partition.delta_column(), delta);
    assert_eq!(partition.to_string().parse::<Partition>().unwrap(), partition);
}

#[test]
fn test_partition_parsing() {
    assert_eq!("none".parse::<Partition>().unwrap(), Partition::Global);
    assert_eq!("product-line".parse::<Partition>().unwrap(), Partition::ProductLine);
    assert!("country".parse::<Partition>().is_err());
}

#[test]
fn test_export_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("region.csv");

    compute_trend(&create_test_table(), Partition::Region)
        .unwrap()
        .write_csv(&path)
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let header = content.lines().next().unwrap();
    assert_eq!(
        header,
        "region,product_line,month,cost_m_usd,revenue_m_usd,margin,region_month_margin_mom_lag,region_month_margin_mom"
    );
    assert_eq!(content.lines().count(), 13);
}
