// crates/bimodal-core/src/datasets.rs

//! Joins normalized counts with weather and holidays into the published hourly and daily
//! datasets.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::info;

use crate::config::TimeInYearsMode;
use crate::error::Result;
use crate::schema::{
    TableName, WeatherKind, DAILY_COLUMNS, HOURLY_COLUMNS, RECORD_TIME, WEATHER_DATASET_RENAME,
};
use crate::store::TableStore;

const DAYS_PER_YEAR: f64 = 365.25;

/// Options shared by both dataset builders.
#[derive(Debug, Clone, Copy)]
pub struct DatasetOptions {
    /// Zero point of `time_in_years`.
    pub epoch_date: NaiveDate,
    pub time_in_years: TimeInYearsMode,
}

fn select_names(names: &[&str]) -> Vec<Expr> {
    names.iter().map(|name| col(*name)).collect()
}

/// Weather table of one kind, reduced to one row per timestamp and renamed to the dataset
/// vocabulary.
fn weather_for_dataset(store: &TableStore, kind: WeatherKind) -> Result<LazyFrame> {
    let kept: Vec<(&str, &str)> = kind
        .columns()
        .normalized_names()
        .filter_map(|name| {
            WEATHER_DATASET_RENAME
                .iter()
                .find(|(from, _)| *from == name)
                .copied()
        })
        .collect();

    let aggregations: Vec<Expr> = kept
        .iter()
        .map(|(from, to)| col(*from).first().alias(*to))
        .collect();

    Ok(store
        .read_table(kind.table_name())?
        .lazy()
        .group_by_stable([col(RECORD_TIME)])
        .agg(aggregations))
}

fn time_in_years(options: &DatasetOptions) -> Expr {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let epoch_days = (options.epoch_date - epoch).num_days();
    let date_days = match options.time_in_years {
        TimeInYearsMode::BatchFirst => col("date").first(),
        TimeInYearsMode::PerRow => col("date"),
    };
    ((date_days.cast(DataType::Int64) - lit(epoch_days)).cast(DataType::Float64)
        / lit(DAYS_PER_YEAR))
    .alias("time_in_years")
}

/// Left-joins counts to wind, rain and temperature on `record_time`, then to holidays on the
/// date part. Every count row appears exactly once; unmatched weather and holiday columns are
/// null. Rows come back ordered by site and time, columns in the published hourly order.
pub fn get_combined_hourly(store: &TableStore, options: &DatasetOptions) -> Result<DataFrame> {
    let mut combined = store.read_table(TableName::CounterData)?.lazy();

    for kind in WeatherKind::ALL {
        let weather = weather_for_dataset(store, kind)?;
        combined = combined.join(
            weather,
            [col(RECORD_TIME)],
            [col(RECORD_TIME)],
            JoinArgs::new(JoinType::Left),
        );
    }

    let holidays = store
        .read_table(TableName::Holidays)?
        .lazy()
        .group_by_stable([col("date")])
        .agg([col("holiday_name").first()]);

    let hourly = combined
        .with_column(col(RECORD_TIME).dt().date().alias("date"))
        .join(
            holidays,
            [col("date")],
            [col("date")],
            JoinArgs::new(JoinType::Left),
        )
        .sort(
            ["site_name", RECORD_TIME],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .with_columns([
            when(col("holiday_name").is_not_null())
                .then(lit(1i32))
                .otherwise(lit(0i32))
                .alias("is_holiday"),
            time_in_years(options),
        ])
        .select(select_names(&HOURLY_COLUMNS))
        .collect()?;
    Ok(hourly)
}

pub fn create_hourly_counts_dataset(
    store: &TableStore,
    options: &DatasetOptions,
) -> Result<DataFrame> {
    let mut hourly = get_combined_hourly(store, options)?;
    store.write_table(TableName::HourlyCounts, &mut hourly)?;
    info!(rows = hourly.height(), "hourly counts dataset written");
    Ok(hourly)
}

/// Aggregates hourly rows per (site, year, month, day), keeping first-seen group order.
pub fn aggregate_daily(hourly: DataFrame) -> Result<DataFrame> {
    let daily = hourly
        .lazy()
        .group_by_stable([col("site_name"), col("year"), col("month"), col("day")])
        .agg([
            col(RECORD_TIME).dt().date().first().alias("date"),
            col("weekday").first(),
            col("is_holiday").first(),
            col("holiday_name").first(),
            col("time_in_years").first(),
            col("count_incoming").sum(),
            col("count_outgoing").sum(),
            col("rainfall").sum().alias("total_rainfall"),
            col("wind_speed").median().alias("median_wind_speed"),
            col("average_temperature").mean(),
        ])
        .select(select_names(&DAILY_COLUMNS))
        .collect()?;
    Ok(daily)
}

pub fn create_daily_counts_dataset(
    store: &TableStore,
    options: &DatasetOptions,
) -> Result<DataFrame> {
    let hourly = get_combined_hourly(store, options)?;
    let mut daily = aggregate_daily(hourly)?;
    store.write_table(TableName::DailyCounts, &mut daily)?;
    info!(rows = daily.height(), "daily counts dataset written");
    Ok(daily)
}
