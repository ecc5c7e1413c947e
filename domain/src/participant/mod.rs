//! Debate participants and their roles

pub mod role;

pub use role::Role;

use crate::util::uuid_v4;
use serde::{Deserialize, Serialize};

/// Unique identifier for an agent (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates an AgentId from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new unique AgentId.
    pub fn generate() -> Self {
        Self(uuid_v4())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for AgentId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A debate participant (Entity)
///
/// Participants are created at setup and are immutable for the lifetime of
/// the debate. The role determines voting weight and prompt framing; the
/// specialties are free-form hints surfaced to the agent adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    id: AgentId,
    role: Role,
    #[serde(default)]
    specialties: Vec<String>,
}

impl Participant {
    pub fn new(id: impl Into<AgentId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            specialties: Vec::new(),
        }
    }

    pub fn with_specialties(mut self, specialties: Vec<String>) -> Self {
        self.specialties = specialties;
        self
    }

    /// Build a participant from an input spec.
    pub fn from_spec(spec: &ParticipantSpec) -> Self {
        Self {
            id: AgentId::new(&spec.id),
            role: spec.role,
            specialties: spec.specialties.clone(),
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn specialties(&self) -> &[String] {
        &self.specialties
    }
}

/// Caller-supplied description of a participant in a debate request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSpec {
    /// Stable identifier for the agent behind this participant
    pub id: String,
    /// Role the participant plays in the debate
    pub role: Role,
    /// Free-form specialty hints
    #[serde(default)]
    pub specialties: Vec<String>,
}

impl ParticipantSpec {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            specialties: Vec::new(),
        }
    }

    pub fn with_specialties(mut self, specialties: Vec<String>) -> Self {
        self.specialties = specialties;
        self
    }
}
