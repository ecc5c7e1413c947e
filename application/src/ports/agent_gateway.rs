//! Agent gateway port
//!
//! Defines the interface for requesting a position from one participant's
//! backing agent. Implementations (adapters) live in the infrastructure
//! layer and are expected to honor the deadline the engine enforces around
//! each call.

use agora_domain::{AgentPrompt, Participant};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during agent gateway operations
///
/// Everything except [`AgentError::Cancelled`] is recoverable from the
/// debate's point of view and turns into an abstention for the phase.
/// Cancellation propagates and aborts the debate.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent unavailable: {0}")]
    Unavailable(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if this error represents a cancellation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }
}

/// One agent's answer to a phase prompt
///
/// The stance is expected to arrive as a normalized label; mapping free
/// text onto comparable labels is the adapter's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    /// Normalized stance label
    pub stance: String,
    /// Confidence in the stance (clamped into [0, 1])
    pub confidence: f64,
    /// Free-form reasoning
    pub rationale: String,
}

impl AgentReply {
    pub fn new(stance: impl Into<String>, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            stance: stance.into(),
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }
}

/// Gateway to the agents behind the debate participants
///
/// This port defines how the protocol engine talks to whatever produces
/// positions - an LLM provider, a remote service, or a scripted test
/// double.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Request a position from the agent backing `participant`.
    async fn respond(
        &self,
        participant: &Participant,
        prompt: &AgentPrompt,
    ) -> Result<AgentReply, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_clamps_confidence() {
        assert_eq!(AgentReply::new("approve", 2.0, "").confidence, 1.0);
        assert_eq!(AgentReply::new("approve", -1.0, "").confidence, 0.0);
    }

    #[test]
    fn test_only_cancelled_is_cancellation() {
        assert!(AgentError::Cancelled.is_cancellation());
        assert!(!AgentError::Timeout.is_cancellation());
        assert!(!AgentError::Unavailable("down".to_string()).is_cancellation());
        assert!(!AgentError::RequestFailed("500".to_string()).is_cancellation());
    }
}
