//! Protocol engine - drives the Proposal → Critique → Review → Synthesis
//! cycle across rounds.
//!
//! Within a phase every participant is dispatched in parallel and bounded
//! by the phase timeout independently, so one slow agent never blocks the
//! round. The only suspension points are the gateway calls; ledger,
//! topology and voting work is synchronous.

use crate::ports::agent_gateway::{AgentError, AgentGateway, AgentReply};
use crate::ports::progress::DebateProgress;
use agora_domain::{
    AgentId, AgentPrompt, Debate, DebateStatus, LedgerError, Participant, Phase, Position,
    PositionLedger, PromptTemplate, RoleWeights, TopologyError, VoteTally, VotingError, topology,
    voting,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fatal protocol failures
///
/// Per-participant trouble (timeouts, request errors) never shows up here;
/// it is absorbed as abstentions. These variants abort the debate.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("no participant responded in round {round} {phase} after {attempts} attempts")]
    PhaseStarvation {
        round: u32,
        phase: Phase,
        attempts: u32,
    },

    #[error("debate cancelled")]
    Cancelled,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ProtocolError {
    /// Check if this error represents a cancellation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ProtocolError::Cancelled)
    }
}

/// What a finished engine run produced
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// The final synthesis tally
    pub tally: VoteTally,
    /// Rounds actually executed
    pub rounds_used: u32,
    /// Winner share at each round's synthesis
    pub round_shares: Vec<f64>,
}

/// How a single dispatch settled
enum DispatchOutcome {
    /// The reply was recorded in the ledger
    Recorded,
    /// Timeout or error; the reason becomes the abstention rationale
    Failed(String),
    /// The gateway reported caller cancellation
    Cancelled,
}

/// Phase driver for one debate
///
/// Stateless between debates: all per-debate state lives in the `Debate`
/// entity and the position ledger handed to [`ProtocolEngine::run`].
pub struct ProtocolEngine<G: AgentGateway + 'static> {
    gateway: Arc<G>,
    weights: RoleWeights,
    cancellation: Option<CancellationToken>,
}

impl<G: AgentGateway + 'static> ProtocolEngine<G> {
    pub fn new(gateway: Arc<G>, weights: RoleWeights) -> Self {
        Self {
            gateway,
            weights,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Run the debate to a terminal status.
    ///
    /// On success the debate is `Converged` or `Exhausted`. On error the
    /// ledger keeps everything recorded so far; the caller marks the debate
    /// `Failed` and attaches the trace.
    pub async fn run(
        &self,
        debate: &mut Debate,
        ledger: &Arc<PositionLedger>,
        progress: &dyn DebateProgress,
    ) -> Result<EngineOutcome, ProtocolError> {
        let max_rounds = debate.config().max_rounds;
        let thresholds = debate.config().thresholds();
        let mut round_shares = Vec::new();
        let mut round = 0;

        loop {
            round += 1;
            debate.begin_round(round);
            progress.on_round_start(round);
            info!(debate_id = %debate.id(), round, "round started");

            self.dispatch_phase(debate, ledger, round, Phase::Proposal, progress)
                .await?;

            debate.set_phase(Phase::Critique);
            self.dispatch_phase(debate, ledger, round, Phase::Critique, progress)
                .await?;

            debate.set_phase(Phase::Review);
            self.review_phase(debate, ledger, round, progress).await?;

            debate.set_phase(Phase::Synthesis);
            progress.on_phase_start(round, Phase::Synthesis, 0);
            let ballots = self.synthesis_ballots(debate, ledger, round);
            let tally = match voting::tally(&ballots, &self.weights, &thresholds) {
                Ok(tally) => tally,
                // An empty ballot set means nobody produced anything usable
                Err(VotingError::NoPositions) => {
                    return Err(ProtocolError::PhaseStarvation {
                        round,
                        phase: Phase::Synthesis,
                        attempts: 1,
                    });
                }
            };
            round_shares.push(tally.winner_share);
            progress.on_phase_complete(round, Phase::Synthesis);
            info!(
                debate_id = %debate.id(),
                round,
                winner = %tally.winning_stance,
                share = tally.winner_share,
                consensus = tally.consensus_reached,
                "synthesis tallied"
            );

            if tally.consensus_reached {
                debate.finish(DebateStatus::Converged);
                return Ok(EngineOutcome {
                    tally,
                    rounds_used: round,
                    round_shares,
                });
            }
            if round >= max_rounds {
                debate.finish(DebateStatus::Exhausted);
                return Ok(EngineOutcome {
                    tally,
                    rounds_used: round,
                    round_shares,
                });
            }
            // The review positions recorded this round seed the next
            // round's proposals through `latest`.
        }
    }

    /// Run a proposal or critique phase, including starvation retries.
    async fn dispatch_phase(
        &self,
        debate: &Debate,
        ledger: &Arc<PositionLedger>,
        round: u32,
        phase: Phase,
        progress: &dyn DebateProgress,
    ) -> Result<(), ProtocolError> {
        let plan = topology::plan(
            debate.participants(),
            debate.topology(),
            phase,
            debate.config().bidirectional,
        )?;
        let retry_limit = debate.config().retry_limit;
        let mut attempt: u32 = 0;

        loop {
            let prompts = self.build_prompts(debate, ledger, round, phase, &plan);
            let outcomes = self
                .fan_out(debate, ledger, round, phase, prompts, progress)
                .await?;

            let responded = outcomes
                .values()
                .filter(|o| matches!(o, DispatchOutcome::Recorded))
                .count();
            let starved = responded == 0;

            if !starved || attempt >= retry_limit {
                // Phase accepted (or fatally starved): materialize the
                // failures as abstentions so the trace is complete.
                for participant in debate.participants() {
                    if let Some(DispatchOutcome::Failed(reason)) = outcomes.get(participant.id()) {
                        ledger.record(Position::abstention(
                            participant.id().clone(),
                            participant.role(),
                            round,
                            phase,
                            reason.clone(),
                        ))?;
                    }
                }
                progress.on_phase_complete(round, phase);

                return if starved {
                    Err(ProtocolError::PhaseStarvation {
                        round,
                        phase,
                        attempts: attempt + 1,
                    })
                } else {
                    Ok(())
                };
            }

            attempt += 1;
            warn!(
                debate_id = %debate.id(),
                round,
                phase = %phase,
                attempt,
                "phase starved, retrying"
            );
        }
    }

    /// Run the review phase. A silent reviewer is not an abstention: it
    /// stands by its proposal, which is carried over verbatim.
    async fn review_phase(
        &self,
        debate: &Debate,
        ledger: &Arc<PositionLedger>,
        round: u32,
        progress: &dyn DebateProgress,
    ) -> Result<(), ProtocolError> {
        let critique_plan = topology::plan(
            debate.participants(),
            debate.topology(),
            Phase::Critique,
            debate.config().bidirectional,
        )?;

        let mut prompts = HashMap::new();
        for participant in debate.participants() {
            let Some(own) = ledger.find(round, Phase::Proposal, participant.id()) else {
                // Proposal guarantees a record per participant; nothing to
                // review without one.
                warn!(agent = %participant.id(), round, "participant has no proposal to review");
                continue;
            };
            let observers: Vec<AgentId> =
                critique_plan.observers_of(participant.id()).cloned().collect();
            let critiques: Vec<Position> = observers
                .iter()
                .filter_map(|critic| ledger.find(round, Phase::Critique, critic))
                .filter(|c| !c.is_abstention())
                .collect();
            prompts.insert(
                participant.id().clone(),
                PromptTemplate::review(participant.role(), debate.topic(), &own, &critiques),
            );
        }

        let outcomes = self
            .fan_out(debate, ledger, round, Phase::Review, prompts, progress)
            .await?;

        for participant in debate.participants() {
            if matches!(outcomes.get(participant.id()), Some(DispatchOutcome::Recorded)) {
                continue;
            }
            if let Some(own) = ledger.find(round, Phase::Proposal, participant.id()) {
                debug!(agent = %participant.id(), round, "silent reviewer, standing by proposal");
                ledger.record(own.carried(Phase::Review))?;
            }
        }
        progress.on_phase_complete(round, Phase::Review);
        Ok(())
    }

    /// Build the prompts for a proposal or critique dispatch.
    fn build_prompts(
        &self,
        debate: &Debate,
        ledger: &Arc<PositionLedger>,
        round: u32,
        phase: Phase,
        plan: &topology::CommunicationPlan,
    ) -> HashMap<AgentId, AgentPrompt> {
        let mut prompts = HashMap::new();
        for participant in debate.participants() {
            let sources: Vec<AgentId> = plan.sources_for(participant.id()).cloned().collect();
            let prompt = match phase {
                Phase::Critique => {
                    // Critique targets: this round's proposals of the
                    // participant's inbound sources.
                    let targets: Vec<Position> = sources
                        .iter()
                        .filter_map(|source| ledger.find(round, Phase::Proposal, source))
                        .filter(|p| !p.is_abstention())
                        .collect();
                    PromptTemplate::critique(participant.role(), debate.topic(), &targets)
                }
                _ => {
                    // Proposal: the prior round's carried position plus the
                    // latest positions of inbound sources.
                    let prior = ledger.latest(participant.id());
                    let peers: Vec<Position> = sources
                        .iter()
                        .filter_map(|source| ledger.latest(source))
                        .filter(|p| !p.is_abstention())
                        .collect();
                    PromptTemplate::proposal(
                        participant.role(),
                        debate.topic(),
                        prior.as_ref(),
                        &peers,
                    )
                }
            };
            prompts.insert(participant.id().clone(), prompt);
        }
        prompts
    }

    /// Dispatch one wave of prompts and collect how each settled.
    ///
    /// Successful replies are recorded inside the dispatch tasks, so the
    /// ledger sees genuinely concurrent writers. Returns an error only on
    /// cancellation, after marking every unfinished participant as
    /// abstained.
    async fn fan_out(
        &self,
        debate: &Debate,
        ledger: &Arc<PositionLedger>,
        round: u32,
        phase: Phase,
        mut prompts: HashMap<AgentId, AgentPrompt>,
        progress: &dyn DebateProgress,
    ) -> Result<HashMap<AgentId, DispatchOutcome>, ProtocolError> {
        let timeout = debate.config().phase_timeout;
        progress.on_phase_start(round, phase, prompts.len());

        let mut join_set = JoinSet::new();
        for participant in debate.participants() {
            let Some(prompt) = prompts.remove(participant.id()) else {
                continue;
            };
            let gateway = Arc::clone(&self.gateway);
            let ledger = Arc::clone(ledger);
            let participant = participant.clone();

            join_set.spawn(async move {
                let outcome = match dispatch_one(
                    gateway.as_ref(),
                    &ledger,
                    &participant,
                    &prompt,
                    round,
                    phase,
                    timeout,
                )
                .await
                {
                    Ok(()) => DispatchOutcome::Recorded,
                    Err(err) if err.is_cancellation() => DispatchOutcome::Cancelled,
                    Err(err) => DispatchOutcome::Failed(err.to_string()),
                };
                (participant, outcome)
            });
        }

        let mut outcomes: HashMap<AgentId, DispatchOutcome> = HashMap::new();
        let mut cancelled = false;

        loop {
            let joined = if let Some(token) = &self.cancellation {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        join_set.abort_all();
                        cancelled = true;
                        break;
                    }
                    joined = join_set.join_next() => joined,
                }
            } else {
                join_set.join_next().await
            };

            let Some(joined) = joined else { break };
            match joined {
                Ok((participant, DispatchOutcome::Cancelled)) => {
                    debug!(agent = %participant.id(), "gateway reported cancellation");
                    join_set.abort_all();
                    cancelled = true;
                    break;
                }
                Ok((participant, outcome)) => {
                    let responded = matches!(outcome, DispatchOutcome::Recorded);
                    progress.on_agent_complete(phase, participant.id(), responded);
                    if !responded {
                        debug!(agent = %participant.id(), round, phase = %phase, "dispatch failed");
                    }
                    outcomes.insert(participant.id().clone(), outcome);
                }
                Err(join_err) => {
                    // A panicked dispatch counts as an unresponsive agent.
                    warn!(round, phase = %phase, "dispatch task failed: {join_err}");
                }
            }
        }

        if cancelled {
            for participant in debate.participants() {
                // A dispatch task may still have recorded its reply right
                // before the abort landed; the duplicate check settles the
                // race in favor of the recorded reply.
                let abstention = Position::abstention(
                    participant.id().clone(),
                    participant.role(),
                    round,
                    phase,
                    "debate cancelled",
                );
                if let Err(LedgerError::DuplicateSubmission { .. }) = ledger.record(abstention) {
                    debug!(agent = %participant.id(), "participant finished before cancellation");
                }
            }
            return Err(ProtocolError::Cancelled);
        }

        Ok(outcomes)
    }

    /// The ballots for a round's synthesis: each participant's review
    /// position, falling back to its proposal.
    fn synthesis_ballots(
        &self,
        debate: &Debate,
        ledger: &Arc<PositionLedger>,
        round: u32,
    ) -> Vec<Position> {
        debate
            .participants()
            .iter()
            .filter_map(|p| {
                ledger
                    .find(round, Phase::Review, p.id())
                    .or_else(|| ledger.find(round, Phase::Proposal, p.id()))
            })
            .collect()
    }
}

/// Run a single gateway call under the phase timeout and record the reply.
async fn dispatch_one<G: AgentGateway>(
    gateway: &G,
    ledger: &PositionLedger,
    participant: &Participant,
    prompt: &AgentPrompt,
    round: u32,
    phase: Phase,
    timeout: Duration,
) -> Result<(), AgentError> {
    let reply: AgentReply = match tokio::time::timeout(timeout, gateway.respond(participant, prompt)).await
    {
        Ok(Ok(reply)) => reply,
        Ok(Err(err)) => return Err(err),
        Err(_) => return Err(AgentError::Timeout),
    };

    let position = Position::new(
        participant.id().clone(),
        participant.role(),
        round,
        phase,
        reply.stance,
        reply.confidence,
        reply.rationale,
    );
    ledger
        .record(position)
        .map_err(|err| AgentError::Other(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::progress::NoProgress;
    use agora_domain::{ProtocolConfig, Role, Topic, TopologyKind};
    use std::sync::Mutex;

    // ==================== Test Mocks ====================

    #[derive(Clone)]
    enum Behavior {
        /// Answer instantly with this stance and confidence
        Reply(&'static str, f64),
        /// Never answer within any phase window
        Silent,
        /// Fail the request outright
        Fail,
        /// Report caller cancellation
        Cancelled,
    }

    struct ScriptedGateway {
        behaviors: HashMap<String, Behavior>,
        calls: Mutex<Vec<(String, String)>>, // (agent, user prompt)
    }

    impl ScriptedGateway {
        fn new(behaviors: &[(&str, Behavior)]) -> Self {
            Self {
                behaviors: behaviors
                    .iter()
                    .map(|(id, b)| (id.to_string(), b.clone()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls_for(&self, agent: &str) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(a, _)| a == agent)
                .map(|(_, prompt)| prompt.clone())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl AgentGateway for ScriptedGateway {
        async fn respond(
            &self,
            participant: &Participant,
            prompt: &AgentPrompt,
        ) -> Result<AgentReply, AgentError> {
            self.calls
                .lock()
                .unwrap()
                .push((participant.id().to_string(), prompt.user.clone()));

            match self.behaviors.get(participant.id().as_str()) {
                Some(Behavior::Reply(stance, confidence)) => {
                    Ok(AgentReply::new(*stance, *confidence, "scripted"))
                }
                Some(Behavior::Silent) | None => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(AgentError::Timeout)
                }
                Some(Behavior::Fail) => Err(AgentError::RequestFailed("boom".to_string())),
                Some(Behavior::Cancelled) => Err(AgentError::Cancelled),
            }
        }
    }

    fn debate(
        roles: &[(&str, Role)],
        topology: TopologyKind,
        config: ProtocolConfig,
    ) -> Debate {
        let participants = roles
            .iter()
            .map(|(id, role)| Participant::new(*id, *role))
            .collect();
        Debate::new(Topic::new("Ship the feature?"), participants, topology, config)
    }

    fn fast_config() -> ProtocolConfig {
        ProtocolConfig::default()
            .with_phase_timeout(Duration::from_millis(40))
            .with_min_confidence(0.6)
    }

    async fn run(
        gateway: ScriptedGateway,
        debate: &mut Debate,
    ) -> (Result<EngineOutcome, ProtocolError>, Arc<PositionLedger>) {
        let ledger = Arc::new(PositionLedger::new());
        let engine = ProtocolEngine::new(Arc::new(gateway), RoleWeights::default());
        let result = engine.run(debate, &ledger, &NoProgress).await;
        (result, ledger)
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_unanimous_mesh_converges_in_one_round() {
        let gateway = ScriptedGateway::new(&[
            ("ana", Behavior::Reply("approve", 0.9)),
            ("cri", Behavior::Reply("approve", 0.9)),
            ("syn", Behavior::Reply("approve", 0.9)),
        ]);
        let mut debate = debate(
            &[
                ("ana", Role::Analyst),
                ("cri", Role::Critic),
                ("syn", Role::Synthesizer),
            ],
            TopologyKind::Mesh,
            fast_config().with_max_rounds(1),
        );

        let (result, ledger) = run(gateway, &mut debate).await;
        let outcome = result.unwrap();

        assert_eq!(outcome.tally.winning_stance, "approve");
        assert_eq!(outcome.tally.winner_share, 1.0);
        assert!(outcome.tally.consensus_reached);
        assert_eq!(outcome.rounds_used, 1);
        assert_eq!(debate.status(), DebateStatus::Converged);
        // 3 proposals + 3 critiques + 3 reviews
        assert_eq!(ledger.len(), 9);
    }

    #[tokio::test]
    async fn test_no_consensus_exhausts_rounds() {
        let gateway = ScriptedGateway::new(&[
            ("ana", Behavior::Reply("approve", 0.8)),
            ("cri", Behavior::Reply("reject", 0.8)),
        ]);
        let mut debate = debate(
            &[("ana", Role::Analyst), ("cri", Role::Analyst)],
            TopologyKind::Mesh,
            fast_config().with_max_rounds(2).with_min_confidence(0.9),
        );

        let (result, _ledger) = run(gateway, &mut debate).await;
        let outcome = result.unwrap();

        assert!(!outcome.tally.consensus_reached);
        assert_eq!(outcome.rounds_used, 2);
        assert_eq!(outcome.round_shares.len(), 2);
        assert_eq!(debate.status(), DebateStatus::Exhausted);
    }

    #[tokio::test]
    async fn test_one_silent_agent_becomes_abstentions() {
        let gateway = ScriptedGateway::new(&[
            ("ana", Behavior::Reply("approve", 0.9)),
            ("cri", Behavior::Reply("approve", 0.9)),
            ("slow", Behavior::Silent),
        ]);
        let mut debate = debate(
            &[
                ("ana", Role::Analyst),
                ("cri", Role::Critic),
                ("slow", Role::Expert),
            ],
            TopologyKind::Mesh,
            fast_config().with_max_rounds(1),
        );

        let (result, ledger) = run(gateway, &mut debate).await;
        let outcome = result.unwrap();

        // The debate still converges on the responsive pair
        assert!(outcome.tally.consensus_reached);
        assert_eq!(debate.status(), DebateStatus::Converged);

        // The silent agent abstained in proposal and critique, and its
        // review carried the proposal abstention forward.
        let slow = AgentId::new("slow");
        let proposal = ledger.find(1, Phase::Proposal, &slow).unwrap();
        assert!(proposal.is_abstention());
        let critique = ledger.find(1, Phase::Critique, &slow).unwrap();
        assert!(critique.is_abstention());
        let review = ledger.find(1, Phase::Review, &slow).unwrap();
        assert!(review.is_abstention());
    }

    #[tokio::test]
    async fn test_failing_agent_becomes_abstention() {
        let gateway = ScriptedGateway::new(&[
            ("ana", Behavior::Reply("approve", 0.9)),
            ("bad", Behavior::Fail),
        ]);
        let mut debate = debate(
            &[("ana", Role::Analyst), ("bad", Role::Critic)],
            TopologyKind::Mesh,
            fast_config().with_max_rounds(1),
        );

        let (result, ledger) = run(gateway, &mut debate).await;
        assert!(result.is_ok());

        let bad = AgentId::new("bad");
        let position = ledger.find(1, Phase::Proposal, &bad).unwrap();
        assert!(position.is_abstention());
        assert!(position.rationale.contains("boom"));
    }

    #[tokio::test]
    async fn test_total_starvation_fails_after_retries() {
        let gateway = ScriptedGateway::new(&[
            ("a", Behavior::Silent),
            ("b", Behavior::Silent),
        ]);
        let mut debate = debate(
            &[("a", Role::Analyst), ("b", Role::Critic)],
            TopologyKind::Mesh,
            fast_config().with_retry_limit(1),
        );

        let (result, ledger) = run(gateway, &mut debate).await;
        let err = result.unwrap_err();

        match err {
            ProtocolError::PhaseStarvation {
                round,
                phase,
                attempts,
            } => {
                assert_eq!(round, 1);
                assert_eq!(phase, Phase::Proposal);
                assert_eq!(attempts, 2); // initial attempt + 1 retry
            }
            other => panic!("expected starvation, got {other:?}"),
        }

        // The final starved attempt left an all-abstain trace
        let proposals = ledger.get(1, Phase::Proposal);
        assert_eq!(proposals.len(), 2);
        assert!(proposals.iter().all(Position::is_abstention));
    }

    #[tokio::test]
    async fn test_silent_reviewer_stands_by_proposal() {
        // "waffler" proposes but is silent from the critique phase onward;
        // its review must copy the proposal, not abstain.
        struct OneShotGateway {
            calls: Mutex<HashMap<String, usize>>,
        }

        #[async_trait::async_trait]
        impl AgentGateway for OneShotGateway {
            async fn respond(
                &self,
                participant: &Participant,
                _prompt: &AgentPrompt,
            ) -> Result<AgentReply, AgentError> {
                let first_call = {
                    let mut calls = self.calls.lock().unwrap();
                    let count = calls.entry(participant.id().to_string()).or_insert(0);
                    *count += 1;
                    *count == 1
                };

                match participant.id().as_str() {
                    "waffler" if first_call => Ok(AgentReply::new("defer", 0.7, "not sure yet")),
                    "waffler" => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Err(AgentError::Timeout)
                    }
                    _ => Ok(AgentReply::new("approve", 0.9, "looks good")),
                }
            }
        }

        let gateway = OneShotGateway {
            calls: Mutex::new(HashMap::new()),
        };
        let mut debate = debate(
            &[
                ("ana", Role::Analyst),
                ("cri", Role::Critic),
                ("waffler", Role::Expert),
            ],
            TopologyKind::Mesh,
            fast_config().with_max_rounds(1).with_min_confidence(0.5),
        );

        let ledger = Arc::new(PositionLedger::new());
        let engine = ProtocolEngine::new(Arc::new(gateway), RoleWeights::default());
        let result = engine.run(&mut debate, &ledger, &NoProgress).await;
        assert!(result.is_ok());

        let waffler = AgentId::new("waffler");
        let review = ledger.find(1, Phase::Review, &waffler).unwrap();
        assert_eq!(review.stance, "defer");
        assert_eq!(review.confidence, 0.7);
        assert!(!review.is_abstention());
    }

    #[tokio::test]
    async fn test_star_critique_routes_through_moderator() {
        let gateway = ScriptedGateway::new(&[
            ("hub", Behavior::Reply("approve", 0.8)),
            ("s1", Behavior::Reply("approve", 0.8)),
            ("s2", Behavior::Reply("reject", 0.8)),
        ]);
        let mut debate = debate(
            &[
                ("hub", Role::Moderator),
                ("s1", Role::Analyst),
                ("s2", Role::Critic),
            ],
            TopologyKind::Star,
            fast_config().with_max_rounds(1),
        );

        let ledger = Arc::new(PositionLedger::new());
        let gateway = Arc::new(gateway);
        let engine = ProtocolEngine::new(Arc::clone(&gateway), RoleWeights::default());
        engine.run(&mut debate, &ledger, &NoProgress).await.unwrap();

        // Proposal prompts carry no peer positions in a star
        let s1_calls = gateway.calls_for("s1");
        assert!(!s1_calls[0].contains("visible to you"));

        // In critique, a spoke sees only the hub's proposal
        assert!(s1_calls[1].contains("hub"));
        assert!(!s1_calls[1].contains("s2"));

        // The hub sees both spokes
        let hub_calls = gateway.calls_for("hub");
        assert!(hub_calls[1].contains("s1"));
        assert!(hub_calls[1].contains("s2"));
    }

    #[tokio::test]
    async fn test_review_positions_seed_next_round() {
        let gateway = ScriptedGateway::new(&[
            ("ana", Behavior::Reply("approve", 0.6)),
            ("cri", Behavior::Reply("reject", 0.6)),
        ]);
        let mut debate = debate(
            &[("ana", Role::Analyst), ("cri", Role::Critic)],
            TopologyKind::Mesh,
            fast_config().with_max_rounds(2).with_min_confidence(0.95),
        );

        let ledger = Arc::new(PositionLedger::new());
        let gateway = Arc::new(gateway);
        let engine = ProtocolEngine::new(Arc::clone(&gateway), RoleWeights::default());
        engine.run(&mut debate, &ledger, &NoProgress).await.unwrap();

        // The round-2 proposal prompt must quote the prior-round position
        let ana_calls = gateway.calls_for("ana");
        // calls: proposal r1, critique r1, review r1, proposal r2, ...
        assert!(ana_calls[3].contains("previous round"));
        assert!(ana_calls[3].contains("cri"));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_with_abstentions() {
        let gateway = ScriptedGateway::new(&[
            ("ana", Behavior::Reply("approve", 0.9)),
            ("slow", Behavior::Silent),
        ]);
        let mut debate = debate(
            &[("ana", Role::Analyst), ("slow", Role::Expert)],
            TopologyKind::Mesh,
            // Long timeout so cancellation, not the timeout, settles "slow"
            ProtocolConfig::default().with_phase_timeout(Duration::from_secs(3600)),
        );

        let token = CancellationToken::new();
        let ledger = Arc::new(PositionLedger::new());
        let engine = ProtocolEngine::new(Arc::new(gateway), RoleWeights::default())
            .with_cancellation(token.clone());

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let err = engine.run(&mut debate, &ledger, &NoProgress).await.unwrap_err();
        assert!(err.is_cancellation());

        // The unfinished participant is an abstention in the partial trace
        let slow = AgentId::new("slow");
        let position = ledger.find(1, Phase::Proposal, &slow).unwrap();
        assert!(position.is_abstention());
        assert!(position.rationale.contains("cancelled"));
    }

    #[tokio::test]
    async fn test_gateway_cancellation_propagates() {
        let gateway = ScriptedGateway::new(&[
            ("ana", Behavior::Cancelled),
            ("cri", Behavior::Reply("approve", 0.9)),
        ]);
        let mut debate = debate(
            &[("ana", Role::Analyst), ("cri", Role::Critic)],
            TopologyKind::Mesh,
            fast_config(),
        );

        let (result, _ledger) = run(gateway, &mut debate).await;
        assert!(result.unwrap_err().is_cancellation());
    }

    #[tokio::test]
    async fn test_rounds_used_never_exceeds_max() {
        let gateway = ScriptedGateway::new(&[
            ("a", Behavior::Reply("yes", 0.5)),
            ("b", Behavior::Reply("no", 0.5)),
        ]);
        let mut debate = debate(
            &[("a", Role::Analyst), ("b", Role::Analyst)],
            TopologyKind::Mesh,
            fast_config().with_max_rounds(3).with_min_confidence(1.0),
        );

        let (result, _) = run(gateway, &mut debate).await;
        let outcome = result.unwrap();
        assert_eq!(outcome.rounds_used, 3);
        assert_eq!(debate.status(), DebateStatus::Exhausted);
    }
}
