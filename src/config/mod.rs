pub mod pipeline_config;
pub mod run_config;

pub use pipeline_config::{AlignConfig, FetchConfig, PipelineConfig, API_KEY_ENV};
pub use run_config::{OutputConfig, RunConfiguration, StrategySpec};

use crate::align::session::SessionError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid time of day: {0} (expected HH:MM)")]
    InvalidTime(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("no API key: set fetch.api_key or the POLYGON_API_KEY environment variable")]
    MissingApiKey,
    #[error("unknown universe prefix '{0}'")]
    UnknownUniverse(String),
    #[error("index {index} out of range for universe '{prefix}' (size {len})")]
    UniverseIndex {
        prefix: String,
        index: usize,
        len: usize,
    },
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    #[error("invalid timeframe: {0} minutes")]
    InvalidTimeframe(u32),
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}
