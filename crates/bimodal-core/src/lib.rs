pub mod config;
pub mod counter;
pub mod datasets;
pub mod db;
pub mod error;
pub mod holidays;
pub mod parse;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod weather;

pub use config::{PipelineConfig, TimeInYearsMode};
pub use error::{PipelineError, Result};
pub use store::TableStore;
