// crates/bimodal-core/src/config.rs

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate};
use serde::Deserialize;
use tracing::info;

use crate::datasets::DatasetOptions;
use crate::error::{PipelineError, Result};

/// How `time_in_years` is filled in the hourly dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInYearsMode {
    /// Elapsed time of the first row in the batch, broadcast to every row. This is how the
    /// published datasets have always been produced, even though it makes the column constant.
    #[default]
    BatchFirst,
    /// Elapsed time of each row's own date.
    PerRow,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub raw_data_path: PathBuf,
    pub clean_data_path: PathBuf,
    pub holiday_years: Vec<i32>,
    pub holiday_subdivision: String,
    pub epoch_date: NaiveDate,
    pub counter_utc_offset_hours: i32,
    pub time_in_years: TimeInYearsMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data_path: PathBuf::from("data/raw"),
            clean_data_path: PathBuf::from("data"),
            holiday_years: (2018..=2023).collect(),
            holiday_subdivision: "WGN".to_string(),
            epoch_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            counter_utc_offset_hours: 12,
            time_in_years: TimeInYearsMode::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a TOML file, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Err(PipelineError::MissingFile(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        if !(-12..=14).contains(&config.counter_utc_offset_hours) {
            return Err(PipelineError::malformed(
                "config",
                format!(
                    "counter_utc_offset_hours must be within -12..=14, got {}",
                    config.counter_utc_offset_hours
                ),
            ));
        }
        Ok(config)
    }

    pub fn counter_source_dir(&self) -> PathBuf {
        self.raw_data_path.join("counter")
    }

    pub fn weather_source_dir(&self) -> PathBuf {
        self.raw_data_path.join("weather")
    }

    /// Fixed zone counter timestamps with an explicit offset are converted into.
    pub fn counter_zone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.counter_utc_offset_hours * 3600).ok_or_else(|| {
            PipelineError::malformed(
                "config",
                format!("invalid UTC offset {}", self.counter_utc_offset_hours),
            )
        })
    }

    pub fn dataset_options(&self) -> DatasetOptions {
        DatasetOptions {
            epoch_date: self.epoch_date,
            time_in_years: self.time_in_years,
        }
    }
}
