#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use bimodal_core::parse::naive_from_micros;
use bimodal_core::PipelineConfig;
use chrono::NaiveDateTime;
use polars::prelude::*;

pub const COUNTER_HEADER: &str = "Site ID,Site name,Date/time,Incoming count,Outgoing count";

/// Four distinct (site, time) keys; 2019-01-21 is Wellington Anniversary Day.
pub const COUNTER_2019: &str = "\
Site ID,Site name,Date/time,Incoming count,Outgoing count
1,Oriental Parade,2019-01-21 08:00:00,5,0
1,Oriental Parade,2019-01-21 08:00:00,0,3
1,Oriental Parade,2019-01-21 09:00:00,7,0
1,Oriental Parade,2019-01-21 09:00:00,0,2
1,Oriental Parade,2019-01-22 08:00:00,4,0
2,Thorndon,2019-01-21 08:00:00,6,0
2,Thorndon,2019-01-21 08:00:00,6,0
2,Thorndon,2019-01-21 08:00:00,0,1
";

pub const WIND_HEADER: &str =
    "Station,Date(NZST),Dir(DegT),Speed(m/s),Dir StdDev,Spd StdDev,Period(Hrs),Freq";
pub const RAIN_HEADER: &str =
    "Station,Date(NZST),Amount(mm),SofG,Deficit(mm),Runoff(mm),Period(Hrs),Freq";
pub const TEMP_HEADER: &str = "Station,Date(NZST),Tmax(C),Period(Hrs),Tmin(C),Period(Hrs),Tgmin(C),Period(Hrs),Tmean(C),RHmean(%),Period(Hrs),Freq";

/// One hourly observation for every weather kind. Timestamps are source end-of-period.
pub struct WeatherRow {
    pub stamp: &'static str,
    pub wind_speed: f64,
    pub rain: f64,
    pub temp_mean: f64,
}

pub fn row(stamp: &'static str, wind_speed: f64, rain: f64, temp_mean: f64) -> WeatherRow {
    WeatherRow {
        stamp,
        wind_speed,
        rain,
        temp_mean,
    }
}

/// Observations for 2019. The first row closes the last hour of 2018.
pub fn weather_rows_2019() -> Vec<WeatherRow> {
    vec![
        row("20190101:0000", 9.9, 9.9, 9.9),
        row("20190121:0900", 5.0, 0.5, 15.0),
        row("20190121:1000", 7.0, 1.0, 17.0),
        row("20190122:0900", 3.0, 0.0, 12.0),
    ]
}

/// Renders a composite export: preamble, then titled wind, rain and temperature blocks, each
/// closed by a blank line.
pub fn composite_weather(rows: &[WeatherRow]) -> String {
    let mut out = String::new();
    out.push_str("Station information:\nAgent Number,Network Number,Start Date\n3445,C64551,19860101\n\n");

    out.push_str("Surface Wind: 10m Hourly\n");
    out.push_str(WIND_HEADER);
    out.push('\n');
    for r in rows {
        out.push_str(&format!("3445,{},200,{},10,1.2,1,H\n", r.stamp, r.wind_speed));
    }
    out.push('\n');

    out.push_str("Rain: Daily\n");
    out.push_str(RAIN_HEADER);
    out.push('\n');
    for r in rows {
        out.push_str(&format!("3445,{},{},-,-,-,1,H\n", r.stamp, r.rain));
    }
    out.push('\n');

    out.push_str("Max_min: Hourly\n");
    out.push_str(TEMP_HEADER);
    out.push('\n');
    for r in rows {
        out.push_str(&format!(
            "3445,{},{},1,{},1,-,1,{},80,1,H\n",
            r.stamp,
            r.temp_mean + 1.0,
            r.temp_mean - 1.0,
            r.temp_mean
        ));
    }
    out.push('\n');
    out
}

pub fn write_file(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(path, contents).expect("write fixture");
    path.to_path_buf()
}

/// Lays out `<root>/raw/{counter,weather}` with the 2019 fixtures and returns a config
/// pointing at it, with cleaned tables going to `<root>/clean`.
pub fn raw_layout(root: &Path) -> PipelineConfig {
    write_file(&root.join("raw/counter/counter-2019.csv"), COUNTER_2019);
    write_file(
        &root.join("raw/weather/weather-2019.csv"),
        &composite_weather(&weather_rows_2019()),
    );
    PipelineConfig {
        raw_data_path: root.join("raw"),
        clean_data_path: root.join("clean"),
        holiday_years: vec![2019],
        ..PipelineConfig::default()
    }
}

pub fn naive(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").expect("fixture timestamp")
}

/// `record_time` (or any datetime column) as naive values.
pub fn datetimes(df: &DataFrame, name: &str) -> Vec<NaiveDateTime> {
    let physical = df
        .column(name)
        .expect("datetime column")
        .cast(&DataType::Int64)
        .expect("cast to physical");
    physical
        .i64()
        .expect("i64 column")
        .into_iter()
        .map(|v| v.and_then(naive_from_micros).expect("non-null datetime"))
        .collect()
}

pub fn i64_values(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .expect("column")
        .i64()
        .expect("i64 column")
        .into_iter()
        .collect()
}

pub fn i32_values(df: &DataFrame, name: &str) -> Vec<Option<i32>> {
    df.column(name)
        .expect("column")
        .i32()
        .expect("i32 column")
        .into_iter()
        .collect()
}

pub fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .expect("column")
        .f64()
        .expect("f64 column")
        .into_iter()
        .collect()
}

pub fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .expect("column")
        .str()
        .expect("str column")
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}
