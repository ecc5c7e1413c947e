//! Infrastructure layer for agora
//!
//! This crate contains adapters for the ports defined in the application
//! layer: configuration file loading and a deterministic scripted agent
//! gateway for exercising the engine without live agents.

pub mod agents;
pub mod config;

// Re-export commonly used types
pub use agents::scripted::{ScriptedAgentGateway, ScriptedTurn};
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileProtocolConfig, FileWeightsConfig,
};
