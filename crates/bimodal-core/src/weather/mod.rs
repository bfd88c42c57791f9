// crates/bimodal-core/src/weather/mod.rs

//! Weather station exports: one composite file per year holding wind, rain and temperature
//! sub-tables. The splitter breaks each file into interim per-kind csvs, the joiner stitches
//! the interim files of every year back together per kind.

mod join;
mod split;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::schema::WeatherKind;
use crate::store::TableStore;

pub use join::{
    interim_files, join_split_weather_files, join_weather_kind, read_interim_file,
    remove_interim_files,
};
pub use split::split_weather_file;

/// Composite exports under `directory` matching `weather-*`, skipping leftover interim files.
pub fn discover_weather_files(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.exists() {
        return Err(PipelineError::MissingFile(directory.to_path_buf()));
    }
    let pattern = directory.join("weather-*");
    let mut files = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let path = entry?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let is_interim = WeatherKind::ALL
            .iter()
            .any(|kind| name.ends_with(&kind.interim_suffix()));
        if path.is_file() && !is_interim {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Splits every composite export, joins the interim files per kind, writes one normalized
/// table per kind and removes the interim files.
///
/// Not atomic: a failure part-way leaves interim files and possibly some written tables behind.
pub fn preprocess_weather_data(
    directory: &Path,
    store: &TableStore,
) -> Result<BTreeMap<WeatherKind, DataFrame>> {
    let sources = discover_weather_files(directory)?;
    info!(count = sources.len(), source = %directory.display(), "splitting weather files");
    for source in &sources {
        split_weather_file(source)?;
    }

    let mut tables = join_split_weather_files(directory)?;
    for (kind, df) in tables.iter_mut() {
        store.write_table(kind.table_name(), df)?;
    }

    let removed = remove_interim_files(directory)?;
    info!(removed, "removed interim weather files");
    Ok(tables)
}
