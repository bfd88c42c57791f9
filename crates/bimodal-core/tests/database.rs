mod common;

use anyhow::Result;
use bimodal_core::db::{Database, DB_FILE_NAME};
use bimodal_core::holidays::NewZealandCalendar;
use bimodal_core::pipeline::preprocess_data;
use bimodal_core::schema::{TableName, WeatherKind};
use bimodal_core::{PipelineError, TableStore};
use common::*;
use polars::prelude::{NamedFrom, Series};
use tempfile::tempdir;
use tokio::runtime::Runtime;

async fn row_count(db: &Database, table: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await?;
    Ok(count)
}

#[test]
fn open_before_create_is_uninitialized() -> Result<()> {
    let dir = tempdir()?;
    let rt = Runtime::new()?;

    let err = rt.block_on(Database::open(dir.path())).unwrap_err();

    assert!(matches!(err, PipelineError::UninitializedStore(path) if path.ends_with(DB_FILE_NAME)));
    Ok(())
}

#[test]
fn build_from_loads_every_table() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = TableStore::memory();
    preprocess_data(&config, &store, &NewZealandCalendar)?;
    let assets = dir.path().join("assets");

    let rt = Runtime::new()?;
    rt.block_on(async {
        let db = Database::create(&assets).await?;
        let summary = db.build_from(&store).await?;

        assert_eq!(summary.sites, 2);
        assert_eq!(summary.counts, 4);
        assert_eq!(summary.weather, 9);
        assert_eq!(row_count(&db, "site").await?, 2);
        assert_eq!(row_count(&db, "count").await?, 4);
        assert_eq!(row_count(&db, "wind").await?, 3);
        assert_eq!(row_count(&db, "rain").await?, 3);
        assert_eq!(row_count(&db, "temperature").await?, 3);

        let (time, incoming, outgoing, month, weekday): (String, Option<i64>, Option<i64>, i64, i64) =
            sqlx::query_as(
                "SELECT record_time, count_incoming, count_outgoing, month, weekday
                 FROM count WHERE site_name = 'Oriental Parade' ORDER BY record_time LIMIT 1",
            )
            .fetch_one(db.pool())
            .await?;
        assert_eq!(time, "2019-01-21 08:00:00");
        assert_eq!(incoming, Some(5));
        assert_eq!(outgoing, Some(3));
        assert_eq!(month, 0);
        assert_eq!(weekday, 0);

        let missing_outgoing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM count WHERE count_outgoing IS NULL",
        )
        .fetch_one(db.pool())
        .await?;
        assert_eq!(missing_outgoing, 1);

        let amount: f64 = sqlx::query_scalar(
            "SELECT amount FROM rain WHERE record_time = '2019-01-21 09:00:00'",
        )
        .fetch_one(db.pool())
        .await?;
        assert_eq!(amount, 1.0);

        db.close().await;
        anyhow::Ok(())
    })?;

    assert!(assets.join(DB_FILE_NAME).exists());
    Ok(())
}

#[test]
fn failed_build_leaves_no_partial_rows() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = TableStore::memory();
    preprocess_data(&config, &store, &NewZealandCalendar)?;

    // Both sites under one id violates the site primary key.
    let mut counts = store.read_table(TableName::CounterData)?;
    let ids = Series::new("site_id".into(), vec![1i64; counts.height()]);
    counts.with_column(ids)?;
    store.write_table(TableName::CounterData, &mut counts)?;

    let rt = Runtime::new()?;
    rt.block_on(async {
        let db = Database::create(dir.path()).await?;
        let err = db.build_from(&store).await.unwrap_err();
        assert!(matches!(err, PipelineError::Sqlx(_)));

        assert_eq!(row_count(&db, "site").await?, 0);
        assert_eq!(row_count(&db, "count").await?, 0);
        assert_eq!(row_count(&db, "wind").await?, 0);
        db.close().await;
        anyhow::Ok(())
    })?;
    Ok(())
}

#[test]
fn create_replaces_an_existing_database() -> Result<()> {
    let dir = tempdir()?;
    let config = raw_layout(dir.path());
    let store = TableStore::memory();
    preprocess_data(&config, &store, &NewZealandCalendar)?;

    let rt = Runtime::new()?;
    rt.block_on(async {
        let first = Database::create(dir.path()).await?;
        first.add_sites(&store.read_table(TableName::CounterData)?).await?;
        first.close().await;

        let second = Database::create(dir.path()).await?;
        assert_eq!(row_count(&second, "site").await?, 0);

        let rain = store.read_table(WeatherKind::Rain.table_name())?;
        assert_eq!(second.add_weather(WeatherKind::Rain, &rain).await?, 3);
        second.close().await;

        let reopened = Database::open(dir.path()).await?;
        assert_eq!(row_count(&reopened, "rain").await?, 3);
        assert_eq!(row_count(&reopened, "wind").await?, 0);
        reopened.close().await;
        anyhow::Ok(())
    })?;
    Ok(())
}
