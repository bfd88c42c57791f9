use std::path::PathBuf;

use anyhow::{Context, Result};
use bimodal_core::db::Database;
use bimodal_core::holidays::NewZealandCalendar;
use bimodal_core::{pipeline, PipelineConfig, TableStore};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Wellington cycle counter and weather pipeline", long_about = None)]
struct Cli {
    /// Pipeline config file (TOML)
    #[arg(long, global = true, env = "BIMODAL_CONFIG")]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean raw counter and weather exports and build the holiday table
    PreprocessData,
    /// Load the cleaned tables into a fresh sqlite database
    BuildDb(AssetsArgs),
    /// Build the hourly and daily datasets from the cleaned tables
    BuildDatasets(AssetsArgs),
}

#[derive(Args, Debug)]
struct AssetsArgs {
    /// Directory holding the cleaned tables; outputs are written here too
    assets_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = PipelineConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::PreprocessData => handle_preprocess(&config),
        Command::BuildDb(args) => handle_build_db(args).await,
        Command::BuildDatasets(args) => handle_build_datasets(args, &config),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn handle_preprocess(config: &PipelineConfig) -> Result<()> {
    let store = TableStore::parquet(&config.clean_data_path);
    let summary = pipeline::preprocess_data(config, &store, &NewZealandCalendar)
        .with_context(|| format!("preprocessing {}", config.raw_data_path.display()))?;
    info!(
        counter_rows = summary.counter_rows,
        wind_rows = summary.wind_rows,
        rain_rows = summary.rain_rows,
        temp_rows = summary.temp_rows,
        holidays = summary.holidays,
        output = %config.clean_data_path.display(),
        "Preprocessing complete"
    );
    Ok(())
}

async fn handle_build_db(args: AssetsArgs) -> Result<()> {
    let store = TableStore::parquet(&args.assets_path);
    let database = Database::create(&args.assets_path)
        .await
        .with_context(|| format!("creating database in {}", args.assets_path.display()))?;
    let summary = database
        .build_from(&store)
        .await
        .context("loading cleaned tables into the database")?;
    info!(
        sites = summary.sites,
        counts = summary.counts,
        weather = summary.weather,
        path = %database.path().display(),
        "Database built"
    );
    database.close().await;
    Ok(())
}

fn handle_build_datasets(args: AssetsArgs, config: &PipelineConfig) -> Result<()> {
    let store = TableStore::parquet(&args.assets_path);
    let summary = pipeline::build_datasets(&store, config)
        .with_context(|| format!("building datasets in {}", args.assets_path.display()))?;
    info!(
        hourly_rows = summary.hourly_rows,
        daily_rows = summary.daily_rows,
        "Datasets built"
    );
    Ok(())
}
