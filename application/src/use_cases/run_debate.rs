//! Run Debate use case
//!
//! The top-level façade: validates the request, wires the engine and its
//! collaborators, drives the debate to completion and shapes the result or
//! the diagnosable failure.

use crate::ports::agent_gateway::AgentGateway;
use crate::ports::progress::{DebateProgress, NoProgress};
use crate::protocol::engine::{ProtocolEngine, ProtocolError};
use agora_domain::{
    Debate, DebateMetrics, DebateResult, DebateStatus, Participant, ParticipantSpec, Phase,
    Position, PositionLedger, ProtocolConfig, RoleWeights, Topic, TopologyError, TopologyKind,
    topology,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Errors that can occur while running a debate
#[derive(Error, Debug)]
pub enum RunDebateError {
    #[error("invalid debate request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("debate {debate_id} failed in round {round} during {phase}: {cause}")]
    Debate {
        debate_id: String,
        round: u32,
        phase: Phase,
        #[source]
        cause: ProtocolError,
        /// Everything recorded before the failure, for diagnosis
        trace: Vec<Position>,
    },
}

impl RunDebateError {
    /// Check if this error represents caller cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RunDebateError::Debate { cause, .. } if cause.is_cancellation()
        )
    }
}

/// Input for the RunDebate use case
///
/// Serializable so embedders can accept it straight off a wire or a file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunDebateInput {
    /// The subject under debate
    pub topic: Topic,
    /// Who participates, with roles and specialties
    pub participants: Vec<ParticipantSpec>,
    /// Shape of the communication graph
    pub topology: TopologyKind,
    /// Round, timeout and consensus parameters
    pub protocol: ProtocolConfig,
}

impl RunDebateInput {
    pub fn new(topic: impl Into<Topic>, participants: Vec<ParticipantSpec>) -> Self {
        Self {
            topic: topic.into(),
            participants,
            topology: TopologyKind::Mesh,
            protocol: ProtocolConfig::default(),
        }
    }

    pub fn with_topology(mut self, topology: TopologyKind) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolConfig) -> Self {
        self.protocol = protocol;
        self
    }
}

/// Use case for running a debate to a consensus decision
///
/// Holds no per-debate state: every execution builds a fresh debate and
/// ledger, and nothing survives past the returned result.
pub struct RunDebateUseCase<G: AgentGateway + 'static> {
    gateway: Arc<G>,
    weights: RoleWeights,
    cancellation: Option<CancellationToken>,
}

impl<G: AgentGateway + 'static> RunDebateUseCase<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            weights: RoleWeights::default(),
            cancellation: None,
        }
    }

    /// Override the role weight configuration.
    pub fn with_role_weights(mut self, weights: RoleWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Propagate a caller-supplied cancellation token through every phase
    /// boundary and dispatch.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: RunDebateInput) -> Result<DebateResult, RunDebateError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunDebateInput,
        progress: &dyn DebateProgress,
    ) -> Result<DebateResult, RunDebateError> {
        validate(&input)?;

        let participants: Vec<Participant> =
            input.participants.iter().map(Participant::from_spec).collect();

        // Fail topology problems (no moderator, for the star) before any
        // round executes.
        for phase in Phase::ALL {
            topology::plan(
                &participants,
                input.topology,
                phase,
                input.protocol.bidirectional,
            )?;
        }

        let mut debate = Debate::new(
            input.topic.clone(),
            participants,
            input.topology,
            input.protocol.clone(),
        );
        info!(
            debate_id = %debate.id(),
            topic = %debate.topic(),
            participants = debate.participants().len(),
            topology = %debate.topology(),
            max_rounds = debate.config().max_rounds,
            "starting debate"
        );

        let ledger = Arc::new(PositionLedger::new());
        let mut engine = ProtocolEngine::new(Arc::clone(&self.gateway), self.weights.clone());
        if let Some(token) = &self.cancellation {
            engine = engine.with_cancellation(token.clone());
        }

        let started = Instant::now();
        match engine.run(&mut debate, &ledger, progress).await {
            Ok(outcome) => {
                let positions = ledger.snapshot();
                let metrics = DebateMetrics::from_positions(&positions)
                    .with_round_shares(outcome.round_shares);
                info!(
                    debate_id = %debate.id(),
                    status = %debate.status(),
                    winner = %outcome.tally.winning_stance,
                    rounds = outcome.rounds_used,
                    "debate finished"
                );
                Ok(DebateResult {
                    debate_id: debate.id().to_string(),
                    topic: debate.topic().content().to_string(),
                    status: debate.status(),
                    winning_stance: outcome.tally.winning_stance,
                    confidence: outcome.tally.winner_share,
                    breakdown: outcome.tally.breakdown,
                    consensus_reached: outcome.tally.consensus_reached,
                    rounds_used: outcome.rounds_used,
                    positions,
                    metrics,
                    elapsed: started.elapsed(),
                })
            }
            Err(cause) => {
                debate.finish(DebateStatus::Failed);
                error!(
                    debate_id = %debate.id(),
                    round = debate.current_round(),
                    phase = ?debate.current_phase(),
                    "debate failed: {cause}"
                );
                Err(RunDebateError::Debate {
                    debate_id: debate.id().to_string(),
                    round: debate.current_round(),
                    phase: debate.current_phase().unwrap_or(Phase::Proposal),
                    cause,
                    trace: ledger.snapshot(),
                })
            }
        }
    }
}

fn validate(input: &RunDebateInput) -> Result<(), RunDebateError> {
    if input.participants.len() < 2 {
        return Err(RunDebateError::InvalidRequest(format!(
            "a debate needs at least 2 participants, got {}",
            input.participants.len()
        )));
    }

    let mut ids = HashSet::new();
    for spec in &input.participants {
        if spec.id.trim().is_empty() {
            return Err(RunDebateError::InvalidRequest(
                "participant ids must not be empty".to_string(),
            ));
        }
        if !ids.insert(spec.id.as_str()) {
            return Err(RunDebateError::InvalidRequest(format!(
                "duplicate participant id: {}",
                spec.id
            )));
        }
    }

    input
        .protocol
        .validate()
        .map_err(|reason| RunDebateError::InvalidRequest(reason.to_string()))
}
