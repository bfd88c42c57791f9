// crates/bimodal-core/src/counter.rs

//! Cleans raw bicycle-counter exports into one normalized counts table.
//!
//! Raw exports are sparse: each physical reading arrives as one row per direction, with the
//! opposite direction's count null or zero. Rows are split by direction, collapsed per
//! (site, timestamp) key, and joined back onto the distinct keys so every key ends up as a
//! single row carrying both directions.
//!
//! Exports can overlap, so the same key may arrive from more than one file. After
//! concatenation those rows are collapsed with the same per-direction maximum, leaving one row
//! per key across all files.
//!
//! Precondition: sparse duplicates for the same key and direction carry the same reading.
//! The collapse keeps the maximum, which is only a tie-break for that case.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::parse::{
    parse_counter_timestamp, parse_datetime_column, parse_int_column, read_string_csv,
    require_columns,
};
use crate::schema::{
    TableName, COUNTER_RENAME, RAW_COUNT_TIME, RAW_INCOMING, RAW_OUTGOING, RAW_SITE_ID,
    RAW_SITE_NAME, RECORD_TIME,
};
use crate::store::TableStore;

fn key_columns() -> [Expr; 3] {
    [col(RAW_SITE_ID), col(RAW_SITE_NAME), col(RAW_COUNT_TIME)]
}

/// Reads one raw counter export, collapses its sparse rows and parses `record_time` into
/// wall time of `zone`.
pub fn clean_counter_file(path: &Path, zone: FixedOffset) -> Result<DataFrame> {
    let context = path.display().to_string();
    let mut data = read_string_csv(path, &[])?;
    require_columns(
        &data,
        [RAW_SITE_ID, RAW_SITE_NAME, RAW_COUNT_TIME, RAW_INCOMING, RAW_OUTGOING],
        &context,
    )?;

    for name in [RAW_SITE_ID, RAW_INCOMING, RAW_OUTGOING] {
        let parsed = parse_int_column(&data, name, &context)?;
        data.with_column(parsed)?;
    }

    let mut cleaned = dedup_sparse_counts(data.lazy()).collect()?;
    let record_time = parse_datetime_column(&cleaned, RECORD_TIME, &context, |raw| {
        parse_counter_timestamp(raw, zone)
    })?;
    cleaned.with_column(record_time)?;
    debug!(file = %context, rows = cleaned.height(), "cleaned counter file");
    Ok(cleaned)
}

/// Split-then-rejoin of sparse directional rows. Expects integer count columns.
pub fn dedup_sparse_counts(data: LazyFrame) -> LazyFrame {
    let incoming = data
        .clone()
        .filter(
            col(RAW_INCOMING)
                .is_not_null()
                .and(col(RAW_OUTGOING).eq(lit(0i64))),
        )
        .group_by(key_columns())
        .agg([col(RAW_INCOMING).max()]);

    let outgoing = data
        .clone()
        .filter(
            col(RAW_OUTGOING)
                .is_not_null()
                .and(col(RAW_INCOMING).eq(lit(0i64))),
        )
        .group_by(key_columns())
        .agg([col(RAW_OUTGOING).max()]);

    let renamed: Vec<Expr> = COUNTER_RENAME
        .iter()
        .map(|(from, to)| col(*from).alias(*to))
        .collect();

    data.select(key_columns())
        .unique_stable(None, UniqueKeepStrategy::First)
        .join(
            incoming,
            key_columns(),
            key_columns(),
            JoinArgs::new(JoinType::Left),
        )
        .join(
            outgoing,
            key_columns(),
            key_columns(),
            JoinArgs::new(JoinType::Left),
        )
        .select(renamed)
}

/// Concatenates cleaned per-file frames, collapses keys repeated across files and derives the
/// calendar columns. Month and weekday are zero-based (January = 0, Monday = 0).
pub fn normalize_counts(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let lazyframes: Vec<LazyFrame> = frames.into_iter().map(DataFrame::lazy).collect();
    let normalized = concat(&lazyframes, UnionArgs::default())?
        .group_by_stable([col("site_id"), col("site_name"), col(RECORD_TIME)])
        .agg([col("count_incoming").max(), col("count_outgoing").max()])
        .with_columns([
            col(RECORD_TIME).dt().year().cast(DataType::Int32).alias("year"),
            (col(RECORD_TIME).dt().month().cast(DataType::Int32) - lit(1i32)).alias("month"),
            col(RECORD_TIME).dt().day().cast(DataType::Int32).alias("day"),
            col(RECORD_TIME).dt().hour().cast(DataType::Int32).alias("hour"),
            (col(RECORD_TIME).dt().weekday().cast(DataType::Int32) - lit(1i32)).alias("weekday"),
        ])
        .sort(
            ["site_name", RECORD_TIME],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(normalized)
}

/// Lists raw counter exports under `source`, in a stable order.
pub fn discover_counter_files(source: &Path) -> Result<Vec<PathBuf>> {
    if !source.exists() {
        return Err(PipelineError::MissingFile(source.to_path_buf()));
    }
    let pattern = source.join("*.csv");
    let mut files = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Cleans every counter export in `source` and writes `counter_data` to the store.
pub fn preprocess_counter_data(
    source: &Path,
    store: &TableStore,
    zone: FixedOffset,
) -> Result<DataFrame> {
    let files = discover_counter_files(source)?;
    if files.is_empty() {
        return Err(PipelineError::MissingFile(source.join("*.csv")));
    }
    info!(count = files.len(), source = %source.display(), "cleaning counter files");

    let frames = files
        .iter()
        .map(|path| clean_counter_file(path, zone))
        .collect::<Result<Vec<_>>>()?;

    let mut normalized = normalize_counts(frames)?;
    store.write_table(TableName::CounterData, &mut normalized)?;
    info!(rows = normalized.height(), "counter data normalized");
    Ok(normalized)
}
