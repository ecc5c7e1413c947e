//! Debate configuration from TOML
//!
//! Example configuration:
//!
//! ```toml
//! [protocol]
//! topology = "star"
//! max_rounds = 5
//! phase_timeout_secs = 90
//! min_confidence = 0.8
//! require_majority = true
//!
//! [weights]
//! moderator = 1.5
//! expert = 1.2
//! ```

use agora_domain::{ProtocolConfig, Role, RoleWeights, TopologyError, TopologyKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised when converting file values into domain configuration
#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("invalid protocol config: {0}")]
    Protocol(String),

    #[error("role weight for {0} must not be negative")]
    NegativeWeight(Role),
}

/// Root configuration file model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// `[protocol]` section
    pub protocol: FileProtocolConfig,
    /// `[weights]` section
    pub weights: FileWeightsConfig,
}

/// Protocol configuration (`[protocol]` section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProtocolConfig {
    /// Communication topology: "mesh", "star" or "chain"
    pub topology: String,
    /// Maximum number of debate rounds
    pub max_rounds: u32,
    /// Per-dispatch timeout in seconds
    pub phase_timeout_secs: u64,
    /// Minimum winner share for consensus (0.0 to 1.0)
    pub min_confidence: f64,
    /// Additionally require a strict majority
    pub require_majority: bool,
    /// Add reverse edges in the chain topology
    pub bidirectional: bool,
    /// Extra attempts for a fully starved phase
    pub retry_limit: u32,
}

impl Default for FileProtocolConfig {
    fn default() -> Self {
        let protocol = ProtocolConfig::default();
        Self {
            topology: TopologyKind::Mesh.as_str().to_string(),
            max_rounds: protocol.max_rounds,
            phase_timeout_secs: protocol.phase_timeout.as_secs(),
            min_confidence: protocol.min_confidence,
            require_majority: protocol.require_majority,
            bidirectional: protocol.bidirectional,
            retry_limit: protocol.retry_limit,
        }
    }
}

impl FileProtocolConfig {
    /// Parse the configured topology kind.
    pub fn topology(&self) -> Result<TopologyKind, ConfigValidationError> {
        Ok(self.topology.parse()?)
    }

    /// Convert into a validated domain protocol config.
    pub fn to_protocol_config(&self) -> Result<ProtocolConfig, ConfigValidationError> {
        let config = ProtocolConfig::default()
            .with_max_rounds(self.max_rounds)
            .with_phase_timeout(Duration::from_secs(self.phase_timeout_secs))
            .with_min_confidence(self.min_confidence)
            .with_require_majority(self.require_majority)
            .with_bidirectional(self.bidirectional)
            .with_retry_limit(self.retry_limit);
        config
            .validate()
            .map_err(|reason| ConfigValidationError::Protocol(reason.to_string()))?;
        Ok(config)
    }
}

/// Role voting weights (`[weights]` section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWeightsConfig {
    pub moderator: f64,
    pub analyst: f64,
    pub critic: f64,
    pub synthesizer: f64,
    pub expert: f64,
}

impl Default for FileWeightsConfig {
    fn default() -> Self {
        Self {
            moderator: Role::Moderator.default_weight(),
            analyst: Role::Analyst.default_weight(),
            critic: Role::Critic.default_weight(),
            synthesizer: Role::Synthesizer.default_weight(),
            expert: Role::Expert.default_weight(),
        }
    }
}

impl FileWeightsConfig {
    /// Convert into domain role weights.
    pub fn to_role_weights(&self) -> Result<RoleWeights, ConfigValidationError> {
        for (role, weight) in self.entries() {
            if weight < 0.0 {
                return Err(ConfigValidationError::NegativeWeight(role));
            }
        }
        let mut weights = RoleWeights::default();
        for (role, weight) in self.entries() {
            weights = weights.with_weight(role, weight);
        }
        Ok(weights)
    }

    fn entries(&self) -> [(Role, f64); 5] {
        [
            (Role::Moderator, self.moderator),
            (Role::Analyst, self.analyst),
            (Role::Critic, self.critic),
            (Role::Synthesizer, self.synthesizer),
            (Role::Expert, self.expert),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_convert_cleanly() {
        let config = FileConfig::default();
        assert_eq!(config.protocol.topology().unwrap(), TopologyKind::Mesh);

        let protocol = config.protocol.to_protocol_config().unwrap();
        assert_eq!(protocol, ProtocolConfig::default());

        let weights = config.weights.to_role_weights().unwrap();
        assert_eq!(weights, RoleWeights::default());
    }

    #[test]
    fn test_parse_toml_overrides() {
        let config: FileConfig = toml::from_str(
            r#"
            [protocol]
            topology = "chain"
            max_rounds = 5
            bidirectional = true

            [weights]
            expert = 1.4
            "#,
        )
        .unwrap();

        assert_eq!(config.protocol.topology().unwrap(), TopologyKind::Chain);
        assert_eq!(config.protocol.max_rounds, 5);
        assert!(config.protocol.bidirectional);
        // Untouched fields keep their defaults
        assert_eq!(config.protocol.phase_timeout_secs, 60);

        let weights = config.weights.to_role_weights().unwrap();
        assert_eq!(weights.weight_for(Role::Expert), 1.4);
        assert_eq!(weights.weight_for(Role::Moderator), 1.2);
    }

    #[test]
    fn test_unknown_topology_is_rejected() {
        let config: FileConfig = toml::from_str(
            r#"
            [protocol]
            topology = "ring"
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.protocol.topology(),
            Err(ConfigValidationError::Topology(TopologyError::Unsupported(_)))
        ));
    }

    #[test]
    fn test_invalid_protocol_values_are_rejected() {
        let config: FileConfig = toml::from_str(
            r#"
            [protocol]
            max_rounds = 0
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.protocol.to_protocol_config(),
            Err(ConfigValidationError::Protocol(_))
        ));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let config: FileConfig = toml::from_str(
            r#"
            [weights]
            critic = -0.5
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.weights.to_role_weights(),
            Err(ConfigValidationError::NegativeWeight(Role::Critic))
        ));
    }
}
