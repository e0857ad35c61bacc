use chrono::NaiveDate;
use margin_etl::ingest::raw_frame;
use margin_etl::record::{parse_month, MONTH};
use margin_etl::{CsvSource, EtlError};
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_csv_source_from_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Region,Product Line,Month,Cost (M$),Revevue (M$)").unwrap();
    writeln!(file, "us-east1,Jobs,2023-01-01,10,12.5").unwrap();
    writeln!(file, "us-west1, SQL ,2023-02-15,20.0,19.0").unwrap();

    let rows = CsvSource::from_path(file.path()).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].region, "us-east1");
    assert_eq!(rows[0].product_line, "Jobs");
    assert_eq!(rows[0].month, date(2023, 1, 1));
    assert_eq!(rows[0].cost_m_usd, Some(10.0));
    assert_eq!(rows[0].revenue_m_usd, Some(12.5));

    // fields are trimmed and months truncated to the first day
    assert_eq!(rows[1].product_line, "SQL");
    assert_eq!(rows[1].month, date(2023, 2, 1));
}

#[rstest]
#[case("2023-01-01", date(2023, 1, 1))]
#[case("2023-03-17", date(2023, 3, 1))]
#[case("2023-04", date(2023, 4, 1))]
#[case("2023/05/09", date(2023, 5, 1))]
#[case("06/30/2023", date(2023, 6, 1))]
#[case("2023-07-01T00:00:00.000+0000", date(2023, 7, 1))]
#[case("2023-08-01 00:00:00", date(2023, 8, 1))]
fn test_parse_month(#[case] raw: &str, #[case] expected: NaiveDate) {
    assert_eq!(parse_month(raw).unwrap(), expected);
}

#[test]
fn test_parse_month_rejects_garbage() {
    assert!(matches!(
        parse_month("January"),
        Err(EtlError::InvalidMonth(_))
    ));
}

#[test]
fn test_correctly_spelled_revenue_header_is_missing() {
    let csv = "Region,Product Line,Month,Cost (M$),Revenue (M$)\nus-east1,Jobs,2023-01-01,10,12\n";

    match CsvSource::from_reader(csv.as_bytes()) {
        Err(EtlError::MissingColumn(columns)) => assert_eq!(columns, "Revevue (M$)"),
        other => panic!("Expected MissingColumn, got {:?}", other),
    }
}

#[test]
fn test_invalid_rows_fail() {
    let bad_month =
        "Region,Product Line,Month,Cost (M$),Revevue (M$)\nus-east1,Jobs,someday,10,12\n";
    assert!(matches!(
        CsvSource::from_reader(bad_month.as_bytes()),
        Err(EtlError::CsvError(_))
    ));

    let bad_cost =
        "Region,Product Line,Month,Cost (M$),Revevue (M$)\nus-east1,Jobs,2023-01-01,ten,12\n";
    assert!(CsvSource::from_reader(bad_cost.as_bytes()).is_err());

    assert!(CsvSource::from_path("nonexistent_file.csv").is_err());
}

#[test]
fn test_raw_frame_uses_canonical_names() {
    let csv = "Region,Product Line,Month,Cost (M$),Revevue (M$)\nus-east1,Jobs,2023-01-01,10,12\n";
    let rows = CsvSource::from_reader(csv.as_bytes()).unwrap();
    let df = raw_frame(&rows).unwrap();

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(
        names,
        vec!["region", "product_line", "month", "cost_m_usd", "revenue_m_usd"]
    );
    assert_eq!(
        df.column(MONTH).unwrap().dtype(),
        &polars::prelude::DataType::Date
    );
}
