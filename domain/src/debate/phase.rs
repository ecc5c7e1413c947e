//! Debate phases

use serde::{Deserialize, Serialize};

/// Phase of a debate round
///
/// Phases always cycle in the same order within a round; a round never
/// skips backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Every participant states an initial position
    Proposal,
    /// Participants critique the positions visible to them
    Critique,
    /// Participants revise their own proposal given the critiques
    Review,
    /// Revised positions are tallied into a consensus decision
    Synthesis,
}

impl Phase {
    /// The phase cycle of a single round, in execution order.
    pub const ALL: [Phase; 4] = [
        Phase::Proposal,
        Phase::Critique,
        Phase::Review,
        Phase::Synthesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Proposal => "proposal",
            Phase::Critique => "critique",
            Phase::Review => "review",
            Phase::Synthesis => "synthesis",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Proposal => "Proposal",
            Phase::Critique => "Critique",
            Phase::Review => "Review",
            Phase::Synthesis => "Synthesis",
        }
    }

    /// The phase that follows this one within a round, if any.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Proposal => Some(Phase::Critique),
            Phase::Critique => Some(Phase::Review),
            Phase::Review => Some(Phase::Synthesis),
            Phase::Synthesis => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert_eq!(Phase::Proposal.next(), Some(Phase::Critique));
        assert_eq!(Phase::Critique.next(), Some(Phase::Review));
        assert_eq!(Phase::Review.next(), Some(Phase::Synthesis));
        assert_eq!(Phase::Synthesis.next(), None);
    }

    #[test]
    fn test_all_matches_next_chain() {
        let mut walked = vec![Phase::Proposal];
        while let Some(next) = walked.last().and_then(Phase::next) {
            walked.push(next);
        }
        assert_eq!(walked, Phase::ALL);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(Phase::Proposal.as_str(), "proposal");
        assert_eq!(Phase::Synthesis.to_string(), "Synthesis");
    }
}
