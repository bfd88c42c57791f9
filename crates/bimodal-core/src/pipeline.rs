// crates/bimodal-core/src/pipeline.rs

use tracing::info;

use crate::config::PipelineConfig;
use crate::counter::preprocess_counter_data;
use crate::datasets::{create_daily_counts_dataset, create_hourly_counts_dataset};
use crate::error::Result;
use crate::holidays::{preprocess_holidays, HolidayCalendar};
use crate::schema::WeatherKind;
use crate::store::TableStore;
use crate::weather::preprocess_weather_data;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub counter_rows: usize,
    pub wind_rows: usize,
    pub rain_rows: usize,
    pub temp_rows: usize,
    pub holidays: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub hourly_rows: usize,
    pub daily_rows: usize,
}

/// Cleans counters and weather under `config.raw_data_path` and builds the holiday table.
/// Every table produced is written to `store`.
pub fn preprocess_data(
    config: &PipelineConfig,
    store: &TableStore,
    calendar: &dyn HolidayCalendar,
) -> Result<PreprocessSummary> {
    let counts =
        preprocess_counter_data(&config.counter_source_dir(), store, config.counter_zone()?)?;
    let weather = preprocess_weather_data(&config.weather_source_dir(), store)?;
    let holidays = preprocess_holidays(
        store,
        calendar,
        &config.holiday_years,
        &config.holiday_subdivision,
    )?;

    let rows = |kind: WeatherKind| weather.get(&kind).map(|df| df.height()).unwrap_or_default();
    let summary = PreprocessSummary {
        counter_rows: counts.height(),
        wind_rows: rows(WeatherKind::Wind),
        rain_rows: rows(WeatherKind::Rain),
        temp_rows: rows(WeatherKind::Temp),
        holidays: holidays.height(),
    };
    info!(?summary, "preprocessing finished");
    Ok(summary)
}

/// Writes the hourly and daily datasets from the normalized tables already in `store`.
pub fn build_datasets(store: &TableStore, config: &PipelineConfig) -> Result<DatasetSummary> {
    let options = config.dataset_options();
    let hourly = create_hourly_counts_dataset(store, &options)?;
    let daily = create_daily_counts_dataset(store, &options)?;

    let summary = DatasetSummary {
        hourly_rows: hourly.height(),
        daily_rows: daily.height(),
    };
    info!(?summary, "datasets built");
    Ok(summary)
}
