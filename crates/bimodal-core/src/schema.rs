// crates/bimodal-core/src/schema.rs

//! Column vocabularies shared by every pipeline stage.
//!
//! Raw exports use human-readable headers; everything downstream of the cleaners speaks the
//! normalized snake_case vocabulary defined here. The tables are immutable and built once.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::error::PipelineError;

pub const RAW_SITE_ID: &str = "Site ID";
pub const RAW_SITE_NAME: &str = "Site name";
pub const RAW_COUNT_TIME: &str = "Date/time";
pub const RAW_INCOMING: &str = "Incoming count";
pub const RAW_OUTGOING: &str = "Outgoing count";

pub const RAW_WEATHER_TIME: &str = "Date(NZST)";
pub const RAW_WEATHER_TIME_FORMAT: &str = "%Y%m%d:%H%M";
pub const RAW_WEATHER_NULL: &str = "-";

pub const RECORD_TIME: &str = "record_time";

/// Raw counter header -> normalized column, in output order.
pub const COUNTER_RENAME: [(&str, &str); 5] = [
    (RAW_SITE_ID, "site_id"),
    (RAW_SITE_NAME, "site_name"),
    (RAW_COUNT_TIME, RECORD_TIME),
    (RAW_INCOMING, "count_incoming"),
    (RAW_OUTGOING, "count_outgoing"),
];

/// Columns derived from `record_time`, never read from source.
pub const CALENDAR_COLUMNS: [&str; 5] = ["year", "month", "day", "hour", "weekday"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WeatherKind {
    Wind,
    Rain,
    Temp,
}

impl WeatherKind {
    /// Order of the stacked sub-tables inside a composite weather export.
    pub const ALL: [WeatherKind; 3] = [WeatherKind::Wind, WeatherKind::Rain, WeatherKind::Temp];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherKind::Wind => "wind",
            WeatherKind::Rain => "rain",
            WeatherKind::Temp => "temp",
        }
    }

    pub fn table_name(&self) -> TableName {
        match self {
            WeatherKind::Wind => TableName::WeatherWind,
            WeatherKind::Rain => TableName::WeatherRain,
            WeatherKind::Temp => TableName::WeatherTemp,
        }
    }

    /// Suffix of the interim files produced by the splitter, e.g. `-wind.csv`.
    pub fn interim_suffix(&self) -> String {
        format!("-{}.csv", self.as_str())
    }

    pub fn columns(&self) -> &'static WeatherColumns {
        &WEATHER_COLUMNS[self]
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wind" => Ok(WeatherKind::Wind),
            "rain" => Ok(WeatherKind::Rain),
            "temp" => Ok(WeatherKind::Temp),
            other => Err(PipelineError::UnknownCategory(other.to_string())),
        }
    }
}

/// Per-type column handling for the raw weather sub-tables.
#[derive(Debug, Clone)]
pub struct WeatherColumns {
    /// Source noise columns discarded by the joiner.
    pub drop: Vec<&'static str>,
    /// Raw header -> normalized column, in output order. Includes the timestamp.
    pub rename: Vec<(&'static str, &'static str)>,
}

impl WeatherColumns {
    pub fn normalized_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rename.iter().map(|(_, to)| *to)
    }

    pub fn is_known(&self, raw: &str) -> bool {
        self.drop.contains(&raw) || self.rename.iter().any(|(from, _)| *from == raw)
    }
}

static WEATHER_COLUMNS: Lazy<HashMap<WeatherKind, WeatherColumns>> = Lazy::new(|| {
    HashMap::from([
        (
            WeatherKind::Wind,
            WeatherColumns {
                drop: vec!["Station", "Freq"],
                rename: vec![
                    (RAW_WEATHER_TIME, RECORD_TIME),
                    ("Dir(DegT)", "dir_deg"),
                    ("Speed(m/s)", "speed_ms"),
                    ("Dir StdDev", "dir_std"),
                    ("Spd StdDev", "speed_std"),
                    ("Period(Hrs)", "period"),
                ],
            },
        ),
        (
            WeatherKind::Rain,
            WeatherColumns {
                drop: vec![
                    "Station",
                    "SofG",
                    "Deficit(mm)",
                    "Runoff(mm)",
                    "Period(Hrs)",
                    "Freq",
                ],
                rename: vec![(RAW_WEATHER_TIME, RECORD_TIME), ("Amount(mm)", "amount")],
            },
        ),
        (
            WeatherKind::Temp,
            WeatherColumns {
                drop: vec![
                    "Station",
                    "Period(Hrs)",
                    "Period(Hrs)_duplicated_0",
                    "Tgmin(C)",
                    "Period(Hrs)_duplicated_1",
                    "Period(Hrs)_duplicated_2",
                    "Freq",
                ],
                rename: vec![
                    (RAW_WEATHER_TIME, RECORD_TIME),
                    ("Tmax(C)", "temp_max_c"),
                    ("Tmin(C)", "temp_min_c"),
                    ("Tmean(C)", "temp_avg_c"),
                    ("RHmean(%)", "rel_humidity_perc"),
                ],
            },
        ),
    ])
});

/// Normalized weather column -> dataset column. Columns absent here are dropped from datasets.
pub const WEATHER_DATASET_RENAME: [(&str, &str); 7] = [
    ("speed_ms", "wind_speed"),
    ("dir_deg", "wind_direction"),
    ("speed_std", "wind_speed_std"),
    ("amount", "rainfall"),
    ("temp_avg_c", "average_temperature"),
    ("temp_min_c", "min_temperature"),
    ("temp_max_c", "max_temperature"),
];

pub const HOURLY_COLUMNS: [&str; 19] = [
    "site_name",
    "record_time",
    "year",
    "month",
    "day",
    "hour",
    "weekday",
    "is_holiday",
    "holiday_name",
    "time_in_years",
    "count_incoming",
    "count_outgoing",
    "wind_speed",
    "wind_speed_std",
    "wind_direction",
    "rainfall",
    "average_temperature",
    "max_temperature",
    "min_temperature",
];

pub const DAILY_COLUMNS: [&str; 14] = [
    "site_name",
    "date",
    "year",
    "month",
    "day",
    "weekday",
    "is_holiday",
    "holiday_name",
    "time_in_years",
    "count_incoming",
    "count_outgoing",
    "median_wind_speed",
    "total_rainfall",
    "average_temperature",
];

/// Names under which tables live in the columnar store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    CounterData,
    WeatherWind,
    WeatherRain,
    WeatherTemp,
    Holidays,
    HourlyCounts,
    DailyCounts,
}

impl TableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::CounterData => "counter_data",
            TableName::WeatherWind => "weather_wind",
            TableName::WeatherRain => "weather_rain",
            TableName::WeatherTemp => "weather_temp",
            TableName::Holidays => "wellington_holidays",
            TableName::HourlyCounts => "dataset_hourly_counts",
            TableName::DailyCounts => "dataset_daily_counts",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
