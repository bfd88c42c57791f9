// crates/bimodal-core/src/parse.rs

//! Row-level parsing of raw string columns.
//!
//! Raw CSVs are read with every column as a string so that a bad cell surfaces as a
//! `MalformedInput` naming the file, column, row and value instead of a silent null.

use std::path::Path;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Offset-aware layouts accepted for counter timestamps.
const AWARE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Naive layouts accepted for counter timestamps; these are taken as already local.
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M:%S %p",
];

/// Reads a CSV with a header row, keeping every column as a string.
pub fn read_string_csv(path: &Path, null_values: &[&str]) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::MissingFile(path.to_path_buf()));
    }

    let mut parse_options = CsvParseOptions::default();
    if !null_values.is_empty() {
        parse_options = parse_options.with_null_values(Some(NullValues::AllColumns(
            null_values.iter().map(|value| (*value).into()).collect(),
        )));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Fails unless every name in `required` is a column of `df`.
pub fn require_columns<'a>(
    df: &DataFrame,
    required: impl IntoIterator<Item = &'a str>,
    context: &str,
) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let missing: Vec<&str> = required
        .into_iter()
        .filter(|name| !present.iter().any(|p| p == name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::malformed(
            context,
            format!("missing column(s) {:?}; found {:?}", missing, present),
        ))
    }
}

pub fn parse_int_column(df: &DataFrame, name: &str, context: &str) -> Result<Series> {
    let values = df.column(name)?.str()?;
    let mut parsed: Vec<Option<i64>> = Vec::with_capacity(values.len());
    for (idx, raw) in values.into_iter().enumerate() {
        let value = match raw.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(text.parse::<i64>().map_err(|_| {
                PipelineError::malformed(
                    context,
                    format!("row {idx}: column '{name}' value '{text}' is not an integer"),
                )
            })?),
        };
        parsed.push(value);
    }
    Ok(Series::new(name.into(), parsed))
}

pub fn parse_float_column(df: &DataFrame, name: &str, context: &str) -> Result<Series> {
    let values = df.column(name)?.str()?;
    let mut parsed: Vec<Option<f64>> = Vec::with_capacity(values.len());
    for (idx, raw) in values.into_iter().enumerate() {
        let value = match raw.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(text.parse::<f64>().map_err(|_| {
                PipelineError::malformed(
                    context,
                    format!("row {idx}: column '{name}' value '{text}' is not a number"),
                )
            })?),
        };
        parsed.push(value);
    }
    Ok(Series::new(name.into(), parsed))
}

/// Parses a counter timestamp into naive wall time of `zone`.
///
/// Strings carrying an explicit offset are converted into `zone`; naive strings are assumed
/// to already be in it.
pub fn parse_counter_timestamp(raw: &str, zone: FixedOffset) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&zone).naive_local());
    }
    for format in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&zone).naive_local());
        }
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Parses a `Date(NZST)` cell and shifts it from end-of-period to start-of-period.
pub fn parse_weather_timestamp(raw: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), format)
        .ok()
        .map(|dt| dt - Duration::hours(1))
}

/// Converts the string column `name` into a naive microsecond datetime column of the same
/// name, using `parser` on every cell. Nulls and unparseable cells are `MalformedInput`.
pub fn parse_datetime_column<F>(
    df: &DataFrame,
    name: &str,
    context: &str,
    parser: F,
) -> Result<Series>
where
    F: Fn(&str) -> Option<NaiveDateTime>,
{
    let values = df.column(name)?.str()?;
    let mut micros: Vec<i64> = Vec::with_capacity(values.len());
    for (idx, raw) in values.into_iter().enumerate() {
        let raw = raw.ok_or_else(|| {
            PipelineError::malformed(context, format!("row {idx}: column '{name}' is empty"))
        })?;
        let parsed = parser(raw).ok_or_else(|| {
            PipelineError::malformed(
                context,
                format!("row {idx}: column '{name}' value '{raw}' is not a recognised timestamp"),
            )
        })?;
        micros.push(naive_to_micros(parsed));
    }
    datetime_series(name, micros)
}

pub fn datetime_series(name: &str, micros: Vec<i64>) -> Result<Series> {
    Ok(Series::new(name.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?)
}

pub fn naive_to_micros(value: NaiveDateTime) -> i64 {
    let dt_utc = value.and_utc();
    dt_utc.timestamp() * 1_000_000 + i64::from(dt_utc.timestamp_subsec_nanos() / 1_000)
}

pub fn naive_from_micros(value: i64) -> Option<NaiveDateTime> {
    let secs = value.div_euclid(1_000_000);
    let micros = value.rem_euclid(1_000_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, micros * 1_000).map(|dt| dt.naive_utc())
}
