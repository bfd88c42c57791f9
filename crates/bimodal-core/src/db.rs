// crates/bimodal-core/src/db.rs

//! Sqlite copy of the normalized tables.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::parse::naive_from_micros;
use crate::schema::{TableName, WeatherKind, RECORD_TIME};
use crate::store::TableStore;

pub const DB_FILE_NAME: &str = "db.sqlite";

const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS site (
    site_id INTEGER PRIMARY KEY NOT NULL,
    site_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS count (
    count_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    site_name TEXT NOT NULL,
    record_time TEXT NOT NULL,
    count_incoming INTEGER,
    count_outgoing INTEGER,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    day INTEGER NOT NULL,
    hour INTEGER NOT NULL,
    weekday INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS wind (
    wind_record_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    record_time TEXT NOT NULL,
    direction_deg INTEGER,
    speed_ms FLOAT NOT NULL,
    direction_std FLOAT,
    speed_std FLOAT,
    period FLOAT NOT NULL
);

CREATE TABLE IF NOT EXISTS rain (
    rain_record_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    record_time TEXT NOT NULL,
    amount FLOAT NOT NULL
);

CREATE TABLE IF NOT EXISTS temperature (
    temperature_record_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    record_time TEXT NOT NULL,
    temp_max_c FLOAT,
    temp_min_c FLOAT,
    temp_avg_c FLOAT,
    rel_humidity_perc INTEGER
);
"#;

const INSERT_SITE: &str = "INSERT INTO site (site_id, site_name) VALUES (?, ?)";

const INSERT_COUNT: &str = r#"
INSERT INTO count
(
    site_name,
    record_time,
    count_incoming,
    count_outgoing,
    year,
    month,
    day,
    hour,
    weekday
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const INSERT_WIND: &str = r#"
INSERT INTO wind
(
    record_time,
    direction_deg,
    speed_ms,
    direction_std,
    speed_std,
    period
) VALUES (?, ?, ?, ?, ?, ?)
"#;

const INSERT_RAIN: &str = "INSERT INTO rain (record_time, amount) VALUES (?, ?)";

const INSERT_TEMPERATURE: &str = r#"
INSERT INTO temperature
(
    record_time,
    temp_max_c,
    temp_min_c,
    temp_avg_c,
    rel_humidity_perc
) VALUES (?, ?, ?, ?, ?)
"#;

/// Relational table receiving a weather kind, and its insert statement. Bound values follow
/// the kind's normalized column order.
pub fn weather_table(kind: WeatherKind) -> (&'static str, &'static str) {
    match kind {
        WeatherKind::Wind => ("wind", INSERT_WIND),
        WeatherKind::Rain => ("rain", INSERT_RAIN),
        WeatherKind::Temp => ("temperature", INSERT_TEMPERATURE),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub sites: u64,
    pub counts: u64,
    pub weather: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    pool: SqlitePool,
}

impl Database {
    /// Creates a fresh database in `dir`, replacing any existing one.
    pub async fn create(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        let path = dir.join(DB_FILE_NAME);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let pool = connect(&path, true).await?;
        sqlx::raw_sql(CREATE_TABLES).execute(&pool).await?;
        info!(path = %path.display(), "database created");
        Ok(Self { path, pool })
    }

    /// Opens the database previously created in `dir`.
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(DB_FILE_NAME);
        if !path.exists() {
            return Err(PipelineError::UninitializedStore(path));
        }
        let pool = connect(&path, false).await?;
        Ok(Self { path, pool })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Loads sites, counts and every weather kind from `store` inside a single transaction.
    /// Any failure rolls the whole load back.
    pub async fn build_from(&self, store: &TableStore) -> Result<BuildSummary> {
        let counts = store.read_table(TableName::CounterData)?;
        let weather = WeatherKind::ALL
            .iter()
            .map(|kind| store.read_table(kind.table_name()).map(|df| (*kind, df)))
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self.pool.begin().await?;
        let mut summary = BuildSummary {
            sites: insert_sites(&mut tx, &counts).await?,
            counts: insert_counts(&mut tx, &counts).await?,
            weather: 0,
        };
        for (kind, df) in &weather {
            summary.weather += insert_weather(&mut tx, *kind, df).await?;
        }
        tx.commit().await?;

        info!(
            sites = summary.sites,
            counts = summary.counts,
            weather = summary.weather,
            "database built"
        );
        Ok(summary)
    }

    pub async fn add_sites(&self, df: &DataFrame) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_sites(&mut tx, df).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn add_counts(&self, df: &DataFrame) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_counts(&mut tx, df).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn add_weather(&self, kind: WeatherKind, df: &DataFrame) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_weather(&mut tx, kind, df).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

fn format_record_time(micros: Option<i64>, row: usize, context: &str) -> Result<String> {
    micros
        .and_then(naive_from_micros)
        .map(|dt| dt.format(RECORD_TIME_FORMAT).to_string())
        .ok_or_else(|| {
            PipelineError::malformed(context, format!("row {row}: missing or invalid record_time"))
        })
}

async fn insert_sites(tx: &mut Transaction<'_, Sqlite>, counts: &DataFrame) -> Result<u64> {
    let sites = counts
        .clone()
        .lazy()
        .select([col("site_id"), col("site_name")])
        .unique_stable(None, UniqueKeepStrategy::First)
        .sort(["site_id"], SortMultipleOptions::default())
        .collect()?;

    let ids = sites.column("site_id")?.i64()?;
    let names = sites.column("site_name")?.str()?;

    let mut inserted = 0;
    for idx in 0..sites.height() {
        let (Some(site_id), Some(site_name)) = (ids.get(idx), names.get(idx)) else {
            return Err(PipelineError::malformed(
                "site",
                format!("row {idx}: site_id and site_name are required"),
            ));
        };
        inserted += sqlx::query(INSERT_SITE)
            .bind(site_id)
            .bind(site_name)
            .execute(&mut **tx)
            .await?
            .rows_affected();
    }
    Ok(inserted)
}

async fn insert_counts(tx: &mut Transaction<'_, Sqlite>, counts: &DataFrame) -> Result<u64> {
    let site_name = counts.column("site_name")?.str()?;
    let record_time = counts.column(RECORD_TIME)?.cast(&DataType::Int64)?;
    let record_time = record_time.i64()?;
    let incoming = counts.column("count_incoming")?.i64()?;
    let outgoing = counts.column("count_outgoing")?.i64()?;
    let year = counts.column("year")?.i32()?;
    let month = counts.column("month")?.i32()?;
    let day = counts.column("day")?.i32()?;
    let hour = counts.column("hour")?.i32()?;
    let weekday = counts.column("weekday")?.i32()?;

    let mut inserted = 0;
    for idx in 0..counts.height() {
        let time = format_record_time(record_time.get(idx), idx, "count")?;
        inserted += sqlx::query(INSERT_COUNT)
            .bind(site_name.get(idx))
            .bind(time)
            .bind(incoming.get(idx))
            .bind(outgoing.get(idx))
            .bind(year.get(idx))
            .bind(month.get(idx))
            .bind(day.get(idx))
            .bind(hour.get(idx))
            .bind(weekday.get(idx))
            .execute(&mut **tx)
            .await?
            .rows_affected();
    }
    Ok(inserted)
}

async fn insert_weather(
    tx: &mut Transaction<'_, Sqlite>,
    kind: WeatherKind,
    df: &DataFrame,
) -> Result<u64> {
    let (table, statement) = weather_table(kind);
    let record_time = df.column(RECORD_TIME)?.cast(&DataType::Int64)?;
    let record_time = record_time.i64()?;
    let measurements = kind
        .columns()
        .normalized_names()
        .filter(|name| *name != RECORD_TIME)
        .map(|name| df.column(name).and_then(|c| c.f64()))
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut inserted = 0;
    for idx in 0..df.height() {
        let time = format_record_time(record_time.get(idx), idx, table)?;
        let mut query = sqlx::query(statement).bind(time);
        for values in &measurements {
            query = query.bind(values.get(idx));
        }
        inserted += query.execute(&mut **tx).await?.rows_affected();
    }
    Ok(inserted)
}
