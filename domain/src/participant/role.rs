//! Participant roles

use serde::{Deserialize, Serialize};

/// Role a participant plays in a debate (Value Object)
///
/// The role is a pure tag: weight and prompt framing are derived from it
/// through the mappings below rather than through role-specific behavior.
///
/// # Example
///
/// ```
/// use agora_domain::Role;
///
/// let role: Role = "moderator".parse().unwrap();
/// assert_eq!(role, Role::Moderator);
/// assert!(role.default_weight() > Role::Analyst.default_weight());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Facilitates the discussion; hub of the star topology
    Moderator,
    /// Breaks the topic down and weighs the evidence
    Analyst,
    /// Hunts for weaknesses in other positions
    Critic,
    /// Combines the strongest elements of competing positions
    Synthesizer,
    /// Contributes depth in a specific specialty
    Expert,
}

impl Role {
    /// All roles, in a stable order.
    pub const ALL: [Role; 5] = [
        Role::Moderator,
        Role::Analyst,
        Role::Critic,
        Role::Synthesizer,
        Role::Expert,
    ];

    /// Get the string identifier for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Moderator => "moderator",
            Role::Analyst => "analyst",
            Role::Critic => "critic",
            Role::Synthesizer => "synthesizer",
            Role::Expert => "expert",
        }
    }

    /// Default voting weight for this role.
    ///
    /// Moderators carry the most weight; critics and synthesizers get a
    /// small premium for the work their roles do on other positions.
    pub fn default_weight(&self) -> f64 {
        match self {
            Role::Moderator => 1.2,
            Role::Critic => 1.1,
            Role::Synthesizer => 1.1,
            Role::Analyst => 1.0,
            Role::Expert => 1.0,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "moderator" => Ok(Role::Moderator),
            "analyst" => Ok(Role::Analyst),
            "critic" => Ok(Role::Critic),
            "synthesizer" => Ok(Role::Synthesizer),
            "expert" => Ok(Role::Expert),
            _ => Err(format!(
                "Unknown role: {}. Valid: moderator, analyst, critic, synthesizer, expert",
                s
            )),
        }
    }
}
