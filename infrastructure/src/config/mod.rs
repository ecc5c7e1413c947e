//! Configuration loading

pub mod file_config;
pub mod loader;

pub use file_config::{ConfigValidationError, FileConfig, FileProtocolConfig, FileWeightsConfig};
pub use loader::ConfigLoader;
