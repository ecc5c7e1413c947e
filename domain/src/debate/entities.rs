//! Debate entities

use crate::core::topic::Topic;
use crate::debate::phase::Phase;
use crate::participant::Participant;
use crate::topology::TopologyKind;
use crate::util::uuid_v4;
use crate::voting::ConsensusThresholds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol parameters for a debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Maximum number of rounds before the debate is declared exhausted
    pub max_rounds: u32,
    /// Time window each participant gets per dispatch, from phase start
    pub phase_timeout: Duration,
    /// Minimum winner share required for consensus (0.0 to 1.0)
    pub min_confidence: f64,
    /// Require the winner share to exceed 0.5 in addition to `min_confidence`
    pub require_majority: bool,
    /// Add reverse edges in the chain topology
    pub bidirectional: bool,
    /// Extra attempts for a phase in which no participant responded
    pub retry_limit: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            phase_timeout: Duration::from_secs(60),
            min_confidence: 0.75,
            require_majority: false,
            bidirectional: false,
            retry_limit: 1,
        }
    }
}

impl ProtocolConfig {
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_require_majority(mut self, require_majority: bool) -> Self {
        self.require_majority = require_majority;
        self
    }

    pub fn with_bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_rounds < 1 {
            return Err("max_rounds must be at least 1");
        }
        if self.phase_timeout.is_zero() {
            return Err("phase_timeout must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err("min_confidence must be between 0.0 and 1.0");
        }
        Ok(())
    }

    /// The consensus thresholds the voting engine applies at synthesis.
    pub fn thresholds(&self) -> ConsensusThresholds {
        ConsensusThresholds {
            min_confidence: self.min_confidence,
            require_majority: self.require_majority,
        }
    }
}

/// Lifecycle status of a debate
///
/// Transitions are one-directional: a debate leaves `Running` exactly once
/// and never re-enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    /// Rounds are still executing
    Running,
    /// A synthesis tally cleared the consensus thresholds
    Converged,
    /// max_rounds elapsed without consensus
    Exhausted,
    /// A fatal error or cancellation aborted the debate
    Failed,
}

impl DebateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebateStatus::Running => "running",
            DebateStatus::Converged => "converged",
            DebateStatus::Exhausted => "exhausted",
            DebateStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DebateStatus::Running)
    }
}

impl std::fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single debate session (Entity)
///
/// Tracks the participants, configuration and progress of one debate. All
/// state is scoped to the debate; nothing survives the final result.
#[derive(Debug, Clone)]
pub struct Debate {
    id: String,
    topic: Topic,
    participants: Vec<Participant>,
    topology: TopologyKind,
    config: ProtocolConfig,
    current_round: u32,
    current_phase: Option<Phase>,
    status: DebateStatus,
}

impl Debate {
    pub fn new(
        topic: Topic,
        participants: Vec<Participant>,
        topology: TopologyKind,
        config: ProtocolConfig,
    ) -> Self {
        Self {
            id: uuid_v4(),
            topic,
            participants,
            topology,
            config,
            current_round: 0,
            current_phase: None,
            status: DebateStatus::Running,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn topology(&self) -> TopologyKind {
        self.topology
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.current_phase
    }

    pub fn status(&self) -> DebateStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == DebateStatus::Running
    }

    /// Advance to a new round. Rounds only move forward; a stale or repeated
    /// round number is ignored.
    pub fn begin_round(&mut self, round: u32) {
        if round > self.current_round {
            self.current_round = round;
            self.current_phase = Some(Phase::Proposal);
        }
    }

    /// Record the phase currently executing.
    pub fn set_phase(&mut self, phase: Phase) {
        self.current_phase = Some(phase);
    }

    /// Move the debate to a terminal status. Only the first terminal
    /// transition out of `Running` takes effect.
    pub fn finish(&mut self, status: DebateStatus) {
        if self.status == DebateStatus::Running && status.is_terminal() {
            self.status = status;
        }
    }
}
