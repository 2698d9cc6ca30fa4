//! Schema module - configuration and dataset types for search sessions.

mod config;
mod dataset;

pub use config::{ConfigError, ConstantRanges, SearchConfig, SearchConfigOverride};
pub use dataset::{Dataset, DatasetError};
