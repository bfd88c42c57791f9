// crates/bimodal-core/src/weather/join.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::parse::{
    parse_datetime_column, parse_float_column, parse_weather_timestamp, read_string_csv,
    require_columns,
};
use crate::schema::{
    WeatherKind, RAW_WEATHER_NULL, RAW_WEATHER_TIME, RAW_WEATHER_TIME_FORMAT, RECORD_TIME,
};

/// Interim files for `kind` under `directory`, sorted by path.
pub fn interim_files(directory: &Path, kind: WeatherKind) -> Result<Vec<PathBuf>> {
    let pattern = directory.join(format!("*{}", kind.interim_suffix()));
    let mut files = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        files.push(entry?);
    }
    files.sort();
    Ok(files)
}

/// Reads one interim file into the normalized shape for `kind`.
///
/// Source timestamps mark the end of each observation period; they are shifted back one hour.
/// The chronologically first observation is dropped since it belongs to the previous year.
pub fn read_interim_file(path: &Path, kind: WeatherKind) -> Result<DataFrame> {
    let context = path.display().to_string();
    let mut raw = read_string_csv(path, &[RAW_WEATHER_NULL])?;
    let columns = kind.columns();

    let unexpected: Vec<String> = raw
        .get_column_names()
        .iter()
        .filter(|name| !columns.is_known(name.as_str()))
        .map(|name| name.to_string())
        .collect();
    if !unexpected.is_empty() {
        return Err(PipelineError::malformed(
            context,
            format!("unexpected {kind} column(s) {unexpected:?}"),
        ));
    }
    require_columns(&raw, columns.rename.iter().map(|(from, _)| *from), &context)?;

    let record_time = parse_datetime_column(&raw, RAW_WEATHER_TIME, &context, |cell| {
        parse_weather_timestamp(cell, RAW_WEATHER_TIME_FORMAT)
    })?;
    raw.with_column(record_time)?;
    for (from, _) in columns.rename.iter().filter(|(from, _)| *from != RAW_WEATHER_TIME) {
        let parsed = parse_float_column(&raw, from, &context)?;
        raw.with_column(parsed)?;
    }

    let renamed: Vec<Expr> = columns
        .rename
        .iter()
        .map(|(from, to)| col(*from).alias(*to))
        .collect();

    let df = raw
        .lazy()
        .select(renamed)
        .sort(
            [RECORD_TIME],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .slice(1, IdxSize::MAX)
        .collect()?;
    debug!(file = %context, rows = df.height(), "read interim weather file");
    Ok(df)
}

/// Concatenates every interim file of one kind into a single time-sorted table.
pub fn join_weather_kind(directory: &Path, kind: WeatherKind) -> Result<DataFrame> {
    let files = interim_files(directory, kind)?;
    if files.is_empty() {
        return Err(PipelineError::MissingFile(
            directory.join(format!("*{}", kind.interim_suffix())),
        ));
    }

    let lazyframes = files
        .iter()
        .map(|path| read_interim_file(path, kind).map(DataFrame::lazy))
        .collect::<Result<Vec<_>>>()?;

    let df = concat(&lazyframes, UnionArgs::default())?
        .sort(
            [RECORD_TIME],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    info!(kind = %kind, files = files.len(), rows = df.height(), "joined weather files");
    Ok(df)
}

/// Joins the interim files of every kind found under `directory`.
pub fn join_split_weather_files(directory: &Path) -> Result<BTreeMap<WeatherKind, DataFrame>> {
    WeatherKind::ALL
        .iter()
        .map(|kind| join_weather_kind(directory, *kind).map(|df| (*kind, df)))
        .collect()
}

/// Removes interim files of every kind. Failures are logged and skipped.
pub fn remove_interim_files(directory: &Path) -> Result<usize> {
    let mut removed = 0;
    for kind in WeatherKind::ALL {
        for path in interim_files(directory, kind)? {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => warn!(file = %path.display(), error = %err, "could not remove interim weather file"),
            }
        }
    }
    Ok(removed)
}
