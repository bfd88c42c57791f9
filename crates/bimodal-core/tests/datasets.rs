mod common;

use anyhow::Result;
use bimodal_core::datasets::{
    aggregate_daily, create_daily_counts_dataset, create_hourly_counts_dataset,
    get_combined_hourly,
};
use bimodal_core::holidays::NewZealandCalendar;
use bimodal_core::pipeline::preprocess_data;
use bimodal_core::schema::{TableName, DAILY_COLUMNS, HOURLY_COLUMNS};
use bimodal_core::{PipelineConfig, TableStore, TimeInYearsMode};
use common::*;
use polars::prelude::{lit, IntoLazy};
use tempfile::tempdir;

fn prepared(config: &PipelineConfig) -> Result<TableStore> {
    let store = TableStore::memory();
    preprocess_data(config, &store, &NewZealandCalendar)?;
    Ok(store)
}

#[test]
fn hourly_rows_carry_weather_and_holidays() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = prepared(&config)?;

    let hourly = create_hourly_counts_dataset(&store, &config.dataset_options())?;

    assert_eq!(hourly.get_column_names(), HOURLY_COLUMNS.to_vec());
    assert_eq!(hourly.height(), 4);
    assert_eq!(store.read_table(TableName::HourlyCounts)?.height(), 4);

    assert_eq!(
        datetimes(&hourly, "record_time"),
        vec![
            naive("2019-01-21 08:00:00"),
            naive("2019-01-21 09:00:00"),
            naive("2019-01-22 08:00:00"),
            naive("2019-01-21 08:00:00"),
        ]
    );
    assert_eq!(
        f64_values(&hourly, "wind_speed"),
        vec![Some(5.0), Some(7.0), Some(3.0), Some(5.0)]
    );
    assert_eq!(
        f64_values(&hourly, "rainfall"),
        vec![Some(0.5), Some(1.0), Some(0.0), Some(0.5)]
    );
    assert_eq!(
        f64_values(&hourly, "average_temperature"),
        vec![Some(15.0), Some(17.0), Some(12.0), Some(15.0)]
    );
    Ok(())
}

#[test]
fn holiday_flag_follows_holiday_name() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = prepared(&config)?;

    let hourly = get_combined_hourly(&store, &config.dataset_options())?;

    let flags = i32_values(&hourly, "is_holiday");
    let names = str_values(&hourly, "holiday_name");
    assert_eq!(flags, vec![Some(1), Some(1), Some(0), Some(1)]);
    for (flag, name) in flags.iter().zip(&names) {
        assert_eq!(*flag == Some(1), name.is_some());
    }
    assert_eq!(names[0].as_deref(), Some("Wellington Anniversary Day"));
    Ok(())
}

#[test]
fn every_count_survives_missing_weather() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    // No weather was recorded for this hour.
    write_file(
        &dir.path().join("raw/counter/counter-extra.csv"),
        &format!("{COUNTER_HEADER}\n2,Thorndon,2019-01-23 10:00:00,8,0\n2,Thorndon,2019-01-23 10:00:00,0,2\n"),
    );
    let store = prepared(&config)?;
    let counts = store.read_table(TableName::CounterData)?;

    let hourly = get_combined_hourly(&store, &config.dataset_options())?;

    assert_eq!(hourly.height(), counts.height());
    assert_eq!(hourly.height(), 5);
    let last = hourly.height() - 1;
    assert_eq!(datetimes(&hourly, "record_time")[last], naive("2019-01-23 10:00:00"));
    assert_eq!(f64_values(&hourly, "wind_speed")[last], None);
    assert_eq!(f64_values(&hourly, "rainfall")[last], None);
    assert_eq!(i64_values(&hourly, "count_incoming")[last], Some(8));
    Ok(())
}

#[test]
fn overlapping_weather_keeps_the_first_reading() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = prepared(&config)?;
    let counts = store.read_table(TableName::CounterData)?;

    // Every rain timestamp appears twice; the later copy carries a different amount.
    let rain = store.read_table(TableName::WeatherRain)?;
    let overlap = rain
        .clone()
        .lazy()
        .with_column(lit(99.0).alias("amount"))
        .collect()?;
    let mut doubled = rain.vstack(&overlap)?;
    store.write_table(TableName::WeatherRain, &mut doubled)?;

    let hourly = get_combined_hourly(&store, &config.dataset_options())?;

    assert_eq!(hourly.height(), counts.height());
    assert_eq!(
        f64_values(&hourly, "rainfall"),
        vec![Some(0.5), Some(1.0), Some(0.0), Some(0.5)]
    );
    Ok(())
}

#[test]
fn time_in_years_is_broadcast_from_the_first_row_by_default() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = prepared(&config)?;

    let hourly = get_combined_hourly(&store, &config.dataset_options())?;

    // 2018-01-01 to 2019-01-21 is 385 days.
    let expected = 385.0 / 365.25;
    for value in f64_values(&hourly, "time_in_years") {
        assert!((value.unwrap() - expected).abs() < 1e-12);
    }
    Ok(())
}

#[test]
fn time_in_years_per_row_uses_each_date() -> Result<()> {
    let dir = tempdir()?;
    let config = PipelineConfig {
        time_in_years: TimeInYearsMode::PerRow,
        ..raw_layout(dir.path())
    };
    let store = prepared(&config)?;

    let hourly = get_combined_hourly(&store, &config.dataset_options())?;

    let values = f64_values(&hourly, "time_in_years");
    assert!((values[0].unwrap() - 385.0 / 365.25).abs() < 1e-12);
    assert!((values[2].unwrap() - 386.0 / 365.25).abs() < 1e-12);
    Ok(())
}

#[test]
fn daily_sums_match_hourly() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = prepared(&config)?;

    let daily = create_daily_counts_dataset(&store, &config.dataset_options())?;

    assert_eq!(daily.get_column_names(), DAILY_COLUMNS.to_vec());
    assert_eq!(store.read_table(TableName::DailyCounts)?.height(), 3);

    // First-seen order: Oriental Parade 21st, Oriental Parade 22nd, Thorndon 21st.
    assert_eq!(
        str_values(&daily, "site_name"),
        vec![
            Some("Oriental Parade".to_string()),
            Some("Oriental Parade".to_string()),
            Some("Thorndon".to_string()),
        ]
    );
    assert_eq!(i32_values(&daily, "day"), vec![Some(21), Some(22), Some(21)]);
    assert_eq!(i64_values(&daily, "count_incoming"), vec![Some(12), Some(4), Some(6)]);
    assert_eq!(i64_values(&daily, "count_outgoing")[0], Some(5));
    assert_eq!(
        f64_values(&daily, "total_rainfall"),
        vec![Some(1.5), Some(0.0), Some(0.5)]
    );
    assert_eq!(
        f64_values(&daily, "median_wind_speed"),
        vec![Some(6.0), Some(3.0), Some(5.0)]
    );
    assert_eq!(
        f64_values(&daily, "average_temperature"),
        vec![Some(16.0), Some(12.0), Some(15.0)]
    );
    assert_eq!(i32_values(&daily, "is_holiday"), vec![Some(1), Some(0), Some(1)]);
    // Daily rows take the first hourly value, so the default mode stays constant across days.
    for value in f64_values(&daily, "time_in_years") {
        assert!((value.unwrap() - 385.0 / 365.25).abs() < 1e-12);
    }
    Ok(())
}

#[test]
fn daily_groups_keep_first_seen_order() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = prepared(&config)?;
    let hourly = get_combined_hourly(&store, &config.dataset_options())?;

    // Reverse the hourly rows; groups must follow the new order rather than sort.
    let reversed = hourly.reverse();
    let daily = aggregate_daily(reversed)?;

    assert_eq!(
        str_values(&daily, "site_name"),
        vec![
            Some("Thorndon".to_string()),
            Some("Oriental Parade".to_string()),
            Some("Oriental Parade".to_string()),
        ]
    );
    assert_eq!(i32_values(&daily, "day"), vec![Some(21), Some(22), Some(21)]);
    Ok(())
}

#[test]
fn datasets_need_the_normalized_tables() {
    let store = TableStore::memory();
    let config = PipelineConfig::default();
    let err = get_combined_hourly(&store, &config.dataset_options()).unwrap_err();
    assert!(matches!(err, bimodal_core::PipelineError::MissingFile(_)));
}
