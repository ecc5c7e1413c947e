//! Communication topology resolution
//!
//! Who sees whom is an explicit, per-phase edge-set value computed fresh
//! from the participant list. An edge `(from, to)` means "`to` must
//! consider `from`'s latest position". Plans are cheap values and are never
//! persisted or mutated.

use crate::debate::phase::Phase;
use crate::participant::{AgentId, Participant, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape of the communication graph among participants
///
/// # Example
///
/// ```
/// use agora_domain::TopologyKind;
///
/// let kind: TopologyKind = "star".parse().unwrap();
/// assert_eq!(kind, TopologyKind::Star);
/// assert!("ring".parse::<TopologyKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    /// Full bidirectional visibility between every pair
    Mesh,
    /// All traffic flows through the moderator
    Star,
    /// Participants form a line in input order
    Chain,
}

impl TopologyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Mesh => "mesh",
            TopologyKind::Star => "star",
            TopologyKind::Chain => "chain",
        }
    }
}

impl std::fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TopologyKind {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mesh" => Ok(TopologyKind::Mesh),
            "star" => Ok(TopologyKind::Star),
            "chain" => Ok(TopologyKind::Chain),
            other => Err(TopologyError::Unsupported(other.to_string())),
        }
    }
}

/// Errors raised while resolving a communication plan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("unsupported topology kind: {0}")]
    Unsupported(String),

    #[error("star topology requires a participant with the moderator role")]
    NoModerator,
}

/// A directed visibility edge: `to` must consider `from`'s latest position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: AgentId,
    pub to: AgentId,
}

impl Edge {
    pub fn new(from: impl Into<AgentId>, to: impl Into<AgentId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The visibility edges for one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationPlan {
    phase: Phase,
    edges: Vec<Edge>,
}

impl CommunicationPlan {
    pub fn new(phase: Phase, edges: Vec<Edge>) -> Self {
        Self { phase, edges }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Agents whose positions `agent` must consider (inbound edges).
    pub fn sources_for<'a>(&'a self, agent: &'a AgentId) -> impl Iterator<Item = &'a AgentId> {
        self.edges
            .iter()
            .filter(move |e| &e.to == agent)
            .map(|e| &e.from)
    }

    /// Agents that consider `agent`'s position (outbound edges).
    pub fn observers_of<'a>(&'a self, agent: &'a AgentId) -> impl Iterator<Item = &'a AgentId> {
        self.edges
            .iter()
            .filter(move |e| &e.from == agent)
            .map(|e| &e.to)
    }

    pub fn contains(&self, from: &AgentId, to: &AgentId) -> bool {
        self.edges.iter().any(|e| &e.from == from && &e.to == to)
    }
}

/// Resolve the communication plan for one phase.
///
/// Pure and deterministic: the same participants, kind and phase always
/// produce the same edge list, in a stable order.
///
/// Star topologies route everything through the first participant holding
/// the moderator role; proposal stays independent so initial positions are
/// unbiased. Review reuses the critique visibility in every topology, so
/// critiques travel back along the edges they arrived on.
pub fn plan(
    participants: &[Participant],
    kind: TopologyKind,
    phase: Phase,
    bidirectional: bool,
) -> Result<CommunicationPlan, TopologyError> {
    let edges = match kind {
        TopologyKind::Mesh => mesh_edges(participants),
        TopologyKind::Star => star_edges(participants, phase)?,
        TopologyKind::Chain => chain_edges(participants, bidirectional),
    };
    Ok(CommunicationPlan::new(phase, edges))
}

fn mesh_edges(participants: &[Participant]) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(participants.len().saturating_sub(1) * participants.len());
    for from in participants {
        for to in participants {
            if from.id() != to.id() {
                edges.push(Edge::new(from.id().clone(), to.id().clone()));
            }
        }
    }
    edges
}

fn star_edges(participants: &[Participant], phase: Phase) -> Result<Vec<Edge>, TopologyError> {
    let hub = participants
        .iter()
        .find(|p| p.role() == Role::Moderator)
        .ok_or(TopologyError::NoModerator)?;

    // Proposals are made independently; visibility starts with critique.
    if phase == Phase::Proposal {
        return Ok(Vec::new());
    }

    let mut edges = Vec::with_capacity(2 * participants.len().saturating_sub(1));
    for spoke in participants {
        if spoke.id() != hub.id() {
            edges.push(Edge::new(spoke.id().clone(), hub.id().clone()));
            edges.push(Edge::new(hub.id().clone(), spoke.id().clone()));
        }
    }
    Ok(edges)
}

fn chain_edges(participants: &[Participant], bidirectional: bool) -> Vec<Edge> {
    let mut edges = Vec::new();
    for pair in participants.windows(2) {
        edges.push(Edge::new(pair[0].id().clone(), pair[1].id().clone()));
        if bidirectional {
            edges.push(Edge::new(pair[1].id().clone(), pair[0].id().clone()));
        }
    }
    edges
}
