//! Debate value objects - immutable records produced while a debate runs.
//!
//! - [`Position`] - One agent's stance in one phase of one round
//! - [`DebateResult`] - Final decision plus the full position trace
//! - [`DebateMetrics`] - Aggregate participation statistics

use crate::debate::entities::DebateStatus;
use crate::debate::phase::Phase;
use crate::participant::{AgentId, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Stance label recorded when a participant misses a phase window.
pub const ABSTAIN_STANCE: &str = "abstain";

/// One participant's position in one phase (Value Object)
///
/// Positions are immutable once recorded; a revision is a new record in a
/// later phase, never an overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// The agent that submitted this position
    pub agent_id: AgentId,
    /// The submitting participant's role, captured for weighting
    pub role: Role,
    /// Round the position belongs to (1-indexed)
    pub round: u32,
    /// Phase the position was submitted in
    pub phase: Phase,
    /// Normalized stance label
    pub stance: String,
    /// Confidence in the stance (0.0 to 1.0)
    pub confidence: f64,
    /// Free-form reasoning behind the stance
    pub rationale: String,
    /// When the position was recorded
    pub submitted_at: DateTime<Utc>,
}

impl Position {
    /// Creates a position from an agent reply. Confidence is clamped into
    /// [0, 1].
    pub fn new(
        agent_id: impl Into<AgentId>,
        role: Role,
        round: u32,
        phase: Phase,
        stance: impl Into<String>,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            role,
            round,
            phase,
            stance: stance.into(),
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Creates the synthetic position recorded when a participant misses a
    /// phase window or errors out.
    pub fn abstention(
        agent_id: impl Into<AgentId>,
        role: Role,
        round: u32,
        phase: Phase,
        cause: impl Into<String>,
    ) -> Self {
        Self::new(agent_id, role, round, phase, ABSTAIN_STANCE, 0.0, cause)
    }

    /// Creates a copy of this position recorded under a different phase.
    ///
    /// Used when a silent reviewer stands by its original stance.
    pub fn carried(&self, phase: Phase) -> Self {
        Self {
            phase,
            submitted_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Stance label with surrounding whitespace removed and case folded,
    /// the form positions are grouped by.
    pub fn normalized_stance(&self) -> String {
        self.stance.trim().to_lowercase()
    }

    /// Returns `true` for synthetic abstentions.
    pub fn is_abstention(&self) -> bool {
        self.normalized_stance() == ABSTAIN_STANCE && self.confidence == 0.0
    }
}

/// Aggregate statistics over a debate's position trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DebateMetrics {
    /// Total positions recorded, synthetic ones included
    pub total_positions: usize,
    /// Positions produced by an actual agent reply
    pub responses: usize,
    /// Synthetic abstentions
    pub abstentions: usize,
    /// Mean confidence over all recorded positions
    pub avg_confidence: f64,
    /// Winner share at each round's synthesis, in round order
    #[serde(default)]
    pub round_shares: Vec<f64>,
}

impl DebateMetrics {
    /// Compute metrics from a position trace.
    pub fn from_positions(positions: &[Position]) -> Self {
        let total_positions = positions.len();
        let abstentions = positions.iter().filter(|p| p.is_abstention()).count();
        let avg_confidence = if total_positions == 0 {
            0.0
        } else {
            positions.iter().map(|p| p.confidence).sum::<f64>() / total_positions as f64
        };

        Self {
            total_positions,
            responses: total_positions - abstentions,
            abstentions,
            avg_confidence,
            round_shares: Vec::new(),
        }
    }

    pub fn with_round_shares(mut self, shares: Vec<f64>) -> Self {
        self.round_shares = shares;
        self
    }
}

/// Complete result of a debate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateResult {
    /// The debate this result belongs to
    pub debate_id: String,
    /// The topic that was debated
    pub topic: String,
    /// Terminal status (`Converged` or `Exhausted`)
    pub status: DebateStatus,
    /// Stance that won the final synthesis tally
    pub winning_stance: String,
    /// The winner's share of the total tallied weight (0.0 to 1.0)
    pub confidence: f64,
    /// Weighted support per stance at the final tally
    pub breakdown: BTreeMap<String, f64>,
    /// Whether the winner cleared the configured thresholds
    pub consensus_reached: bool,
    /// Rounds actually executed
    pub rounds_used: u32,
    /// Full audit trace of every recorded position
    pub positions: Vec<Position>,
    /// Aggregate participation statistics
    pub metrics: DebateMetrics,
    /// Wall-clock duration of the debate
    pub elapsed: Duration,
}

impl DebateResult {
    /// Returns an iterator over the positions of a single phase of a round,
    /// in submission order.
    pub fn positions_in(&self, round: u32, phase: Phase) -> impl Iterator<Item = &Position> {
        self.positions
            .iter()
            .filter(move |p| p.round == round && p.phase == phase)
    }

    /// Returns an iterator over the synthetic abstentions in the trace.
    pub fn abstentions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_abstention())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(stance: &str, confidence: f64) -> Position {
        Position::new(
            "a1",
            Role::Analyst,
            1,
            Phase::Proposal,
            stance,
            confidence,
            "because",
        )
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(position("approve", 1.7).confidence, 1.0);
        assert_eq!(position("approve", -0.2).confidence, 0.0);
    }

    #[test]
    fn test_abstention() {
        let p = Position::abstention("a1", Role::Expert, 2, Phase::Critique, "timed out");
        assert!(p.is_abstention());
        assert_eq!(p.stance, ABSTAIN_STANCE);
        assert_eq!(p.confidence, 0.0);
        assert_eq!(p.rationale, "timed out");
    }

    #[test]
    fn test_normalized_stance() {
        assert_eq!(position("  Approve ", 0.8).normalized_stance(), "approve");
    }

    #[test]
    fn test_carried_changes_phase_only() {
        let original = position("approve", 0.8);
        let carried = original.carried(Phase::Review);

        assert_eq!(carried.phase, Phase::Review);
        assert_eq!(carried.round, original.round);
        assert_eq!(carried.stance, original.stance);
        assert_eq!(carried.confidence, original.confidence);
    }

    #[test]
    fn test_deliberate_abstain_with_confidence_is_not_synthetic() {
        // An agent may genuinely answer "abstain" with conviction; only the
        // zero-confidence form is the synthetic record.
        let p = position("abstain", 0.9);
        assert!(!p.is_abstention());
    }

    #[test]
    fn test_metrics_from_positions() {
        let positions = vec![
            position("approve", 0.8),
            position("reject", 0.4),
            Position::abstention("a3", Role::Expert, 1, Phase::Proposal, "timed out"),
        ];
        let metrics = DebateMetrics::from_positions(&positions);

        assert_eq!(metrics.total_positions, 3);
        assert_eq!(metrics.responses, 2);
        assert_eq!(metrics.abstentions, 1);
        assert!((metrics.avg_confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_empty() {
        let metrics = DebateMetrics::from_positions(&[]);
        assert_eq!(metrics.total_positions, 0);
        assert_eq!(metrics.avg_confidence, 0.0);
    }

    #[test]
    fn test_result_serde_round_trip() {
        let result = DebateResult {
            debate_id: "d-1".to_string(),
            topic: "Adopt RFC 1234?".to_string(),
            status: DebateStatus::Converged,
            winning_stance: "approve".to_string(),
            confidence: 1.0,
            breakdown: BTreeMap::from([("approve".to_string(), 2.7)]),
            consensus_reached: true,
            rounds_used: 1,
            positions: vec![position("approve", 0.9)],
            metrics: DebateMetrics::default(),
            elapsed: Duration::from_millis(120),
        };

        let json = serde_json::to_string(&result).unwrap();
        let back: DebateResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.winning_stance, "approve");
        assert_eq!(back.rounds_used, 1);
        assert_eq!(back.positions.len(), 1);
    }
}
