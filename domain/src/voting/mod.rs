//! Weighted-voting consensus engine
//!
//! A tally is a pure function of the positions, the role weights and the
//! thresholds: identical inputs always produce the identical result,
//! independent of submission order. Stances are consumed as pre-normalized
//! labels; grouping folds case and trims so adapters that disagree on
//! casing cannot split a stance. Semantic clustering of free text stays
//! behind this input contract.

use crate::debate::value_objects::Position;
use crate::participant::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by the voting engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingError {
    #[error("no positions to tally")]
    NoPositions,
}

/// Voting weight per role
///
/// Defaults come from [`Role::default_weight`]; callers can override single
/// roles. Unknown roles fall back to a weight of 1.0.
///
/// # Example
///
/// ```
/// use agora_domain::{Role, RoleWeights};
///
/// let weights = RoleWeights::default().with_weight(Role::Expert, 1.5);
/// assert_eq!(weights.weight_for(Role::Expert), 1.5);
/// assert_eq!(weights.weight_for(Role::Moderator), 1.2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleWeights {
    weights: HashMap<Role, f64>,
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            weights: Role::ALL
                .iter()
                .map(|role| (*role, role.default_weight()))
                .collect(),
        }
    }
}

impl RoleWeights {
    pub fn with_weight(mut self, role: Role, weight: f64) -> Self {
        self.weights.insert(role, weight);
        self
    }

    pub fn weight_for(&self, role: Role) -> f64 {
        self.weights.get(&role).copied().unwrap_or(1.0)
    }
}

/// Thresholds a winning stance must clear to count as consensus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsensusThresholds {
    /// Minimum winner share of the total tallied weight
    pub min_confidence: f64,
    /// Additionally require the winner share to exceed 0.5
    pub require_majority: bool,
}

impl Default for ConsensusThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.75,
            require_majority: false,
        }
    }
}

/// Outcome of tallying one set of positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Stance with the highest aggregate weight
    pub winning_stance: String,
    /// The winner's share of the total weight, 0 when nothing carried weight
    pub winner_share: f64,
    /// Aggregate weight per normalized stance
    pub breakdown: BTreeMap<String, f64>,
    /// Sum of raw (unweighted) confidences per normalized stance
    pub raw_confidence: BTreeMap<String, f64>,
    /// Sum of all group weights
    pub total_weight: f64,
    /// Whether the winner cleared the thresholds
    pub consensus_reached: bool,
}

/// Tally positions into a consensus decision.
///
/// Each position contributes `role_weight × confidence` to its stance
/// group. The winner is the group with the highest aggregate weight; ties
/// break first on the higher sum of raw confidences, then on the
/// lexicographically smallest label. An all-abstain input, or one with no
/// aggregate weight at all, never reaches consensus regardless of
/// thresholds.
pub fn tally(
    positions: &[Position],
    weights: &RoleWeights,
    thresholds: &ConsensusThresholds,
) -> Result<VoteTally, VotingError> {
    if positions.is_empty() {
        return Err(VotingError::NoPositions);
    }

    let mut breakdown: BTreeMap<String, f64> = BTreeMap::new();
    let mut raw_confidence: BTreeMap<String, f64> = BTreeMap::new();
    for position in positions {
        let stance = position.normalized_stance();
        let weight = weights.weight_for(position.role) * position.confidence;
        *breakdown.entry(stance.clone()).or_insert(0.0) += weight;
        *raw_confidence.entry(stance).or_insert(0.0) += position.confidence;
    }

    let total_weight: f64 = breakdown.values().sum();

    // Single pass in lexicographic (BTreeMap) order: strict comparisons keep
    // the earliest label on a full tie, which is exactly the tie-break rule.
    let mut winner: Option<(&str, f64, f64)> = None;
    for (stance, weight) in &breakdown {
        let raw = raw_confidence.get(stance).copied().unwrap_or(0.0);
        let better = match winner {
            None => true,
            Some((_, best_weight, best_raw)) => {
                *weight > best_weight || (*weight == best_weight && raw > best_raw)
            }
        };
        if better {
            winner = Some((stance.as_str(), *weight, raw));
        }
    }
    let (winning_stance, winner_weight, _) = winner.ok_or(VotingError::NoPositions)?;

    let winner_share = if total_weight > 0.0 {
        winner_weight / total_weight
    } else {
        0.0
    };

    let all_abstain = positions.iter().all(Position::is_abstention);
    let consensus_reached = !all_abstain
        && total_weight > 0.0
        && winner_share >= thresholds.min_confidence
        && (!thresholds.require_majority || winner_share > 0.5);

    Ok(VoteTally {
        winning_stance: winning_stance.to_string(),
        winner_share,
        breakdown,
        raw_confidence,
        total_weight,
        consensus_reached,
    })
}
