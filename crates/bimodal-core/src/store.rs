// crates/bimodal-core/src/store.rs

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::schema::TableName;

/// Columnar table store addressed by [`TableName`].
#[derive(Debug, Clone)]
pub struct TableStore {
    inner: TableStoreKind,
}

#[derive(Debug, Clone)]
enum TableStoreKind {
    /// One `<name>.parquet` file per table under `root`.
    Parquet { root: PathBuf },
    Memory(Arc<Mutex<HashMap<TableName, DataFrame>>>),
}

impl TableStore {
    pub fn parquet(root: impl Into<PathBuf>) -> Self {
        TableStore {
            inner: TableStoreKind::Parquet { root: root.into() },
        }
    }

    pub fn memory() -> Self {
        TableStore {
            inner: TableStoreKind::Memory(Arc::default()),
        }
    }

    /// Location of the parquet file backing `name`, if this is a parquet store.
    pub fn table_path(&self, name: TableName) -> Option<PathBuf> {
        match &self.inner {
            TableStoreKind::Parquet { root } => Some(parquet_path(root, name)),
            TableStoreKind::Memory(_) => None,
        }
    }

    pub fn write_table(&self, name: TableName, df: &mut DataFrame) -> Result<()> {
        match &self.inner {
            TableStoreKind::Parquet { root } => {
                std::fs::create_dir_all(root)?;
                let path = parquet_path(root, name);
                let file = File::create(&path)?;
                ParquetWriter::new(file)
                    .with_compression(ParquetCompression::Zstd(None))
                    .with_statistics(StatisticsOptions::default())
                    .finish(df)?;
                info!(table = %name, rows = df.height(), path = %path.display(), "wrote table");
            }
            TableStoreKind::Memory(tables) => {
                let mut guard = tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                guard.insert(name, df.clone());
                debug!(table = %name, rows = df.height(), "stored table in memory");
            }
        }
        Ok(())
    }

    pub fn read_table(&self, name: TableName) -> Result<DataFrame> {
        match &self.inner {
            TableStoreKind::Parquet { root } => {
                let path = parquet_path(root, name);
                if !path.exists() {
                    return Err(PipelineError::MissingFile(path));
                }
                let df = ParquetReader::new(File::open(&path)?).finish()?;
                debug!(table = %name, rows = df.height(), "read table");
                Ok(df)
            }
            TableStoreKind::Memory(tables) => {
                let guard = tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                guard
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| PipelineError::MissingFile(PathBuf::from(name.as_str())))
            }
        }
    }

    pub fn contains(&self, name: TableName) -> bool {
        match &self.inner {
            TableStoreKind::Parquet { root } => parquet_path(root, name).exists(),
            TableStoreKind::Memory(tables) => tables
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .contains_key(&name),
        }
    }
}

fn parquet_path(root: &Path, name: TableName) -> PathBuf {
    root.join(format!("{}.parquet", name.as_str()))
}
