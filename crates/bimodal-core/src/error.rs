// crates/bimodal-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed input in {context}: {message}")]
    MalformedInput { context: String, message: String },

    #[error("Required input not found: {0}")]
    MissingFile(PathBuf),

    #[error("Database not initialised at {0}")]
    UninitializedStore(PathBuf),

    #[error("Unknown weather category: {0}")]
    UnknownCategory(String),

    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Invalid glob pattern: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Could not read path from glob pattern: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl PipelineError {
    pub fn malformed(context: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::MalformedInput {
            context: context.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
