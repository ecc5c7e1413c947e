//! Prompt templates for the debate phases
//!
//! Role framing and phase instructions are pure mappings; the engine never
//! branches on role beyond looking up these templates.

use crate::core::topic::Topic;
use crate::debate::value_objects::Position;
use crate::participant::Role;
use crate::util::truncate_str;

/// Longest rationale excerpt quoted back into a peer prompt.
const RATIONALE_EXCERPT_BYTES: usize = 600;

/// A system/user prompt pair handed to an agent adapter
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPrompt {
    /// Role and phase framing
    pub system: String,
    /// The actual task, including visible peer positions
    pub user: String,
}

/// Templates for generating prompts at each debate phase
pub struct PromptTemplate;

impl PromptTemplate {
    /// Role framing used as the base of every system prompt
    pub fn role_system(role: Role) -> &'static str {
        match role {
            Role::Moderator => {
                "You are the moderator of a structured debate. You facilitate the \
                 discussion, weigh the arguments fairly and push the group toward consensus."
            }
            Role::Analyst => {
                "You are an analyst in a structured debate. You break the topic down, \
                 weigh evidence carefully and keep your reasoning explicit."
            }
            Role::Critic => {
                "You are a critic in a structured debate. You hunt for logical flaws, \
                 missing considerations and failure modes in the positions you see."
            }
            Role::Synthesizer => {
                "You are a synthesizer in a structured debate. You combine the strongest \
                 elements of competing positions into a coherent whole."
            }
            Role::Expert => {
                "You are a domain expert in a structured debate. You contribute depth and \
                 concrete knowledge from your specialty."
            }
        }
    }

    /// Prompt for the proposal phase.
    ///
    /// `prior` is the participant's own position from the previous round
    /// (absent in round 1); `peers` are the positions visible through the
    /// proposal plan's inbound edges.
    pub fn proposal(role: Role, topic: &Topic, prior: Option<&Position>, peers: &[Position]) -> AgentPrompt {
        let system = format!(
            "{}\n\nCurrent phase: Proposal.\n\
             State a clear stance on the topic with supporting reasoning, and give \
             your confidence in it as a number between 0 and 1.",
            Self::role_system(role)
        );

        let mut user = format!("Topic: {}\n", topic);
        if let Some(prior) = prior {
            user.push_str(&format!(
                "\nYour position from the previous round (revise it or stand by it):\n{}\n",
                format_position(prior)
            ));
        }
        if !peers.is_empty() {
            user.push_str("\nLatest positions visible to you:\n");
            push_positions(&mut user, peers);
        }
        user.push_str("\nPropose your stance on the topic.");

        AgentPrompt { system, user }
    }

    /// Prompt for the critique phase.
    ///
    /// `targets` are the proposals visible through the critique plan's
    /// inbound edges; the reply's stance names the stance being critiqued.
    pub fn critique(role: Role, topic: &Topic, targets: &[Position]) -> AgentPrompt {
        let system = format!(
            "{}\n\nCurrent phase: Critique.\n\
             Examine the positions below for weaknesses, missing considerations and \
             risks. Name the stance you are critiquing and give your confidence in \
             the critique as a number between 0 and 1.",
            Self::role_system(role)
        );

        let mut user = format!("Topic: {}\n", topic);
        if targets.is_empty() {
            user.push_str("\nNo peer positions are visible to you this phase.\n");
        } else {
            user.push_str("\nPositions to critique:\n");
            push_positions(&mut user, targets);
        }
        user.push_str("\nDeliver your critique.");

        AgentPrompt { system, user }
    }

    /// Prompt for the review phase.
    ///
    /// The participant revises its own proposal given the critiques that
    /// were directed at it.
    pub fn review(role: Role, topic: &Topic, own: &Position, critiques: &[Position]) -> AgentPrompt {
        let system = format!(
            "{}\n\nCurrent phase: Review.\n\
             Reconsider your own proposal in light of the critiques. Either revise \
             your stance or stand by it, and restate your confidence as a number \
             between 0 and 1.",
            Self::role_system(role)
        );

        let mut user = format!(
            "Topic: {}\n\nYour proposal:\n{}\n",
            topic,
            format_position(own)
        );
        if critiques.is_empty() {
            user.push_str("\nNo critiques were directed at your proposal.\n");
        } else {
            user.push_str("\nCritiques directed at your proposal:\n");
            push_positions(&mut user, critiques);
        }
        user.push_str("\nState your revised (or reaffirmed) position.");

        AgentPrompt { system, user }
    }
}

fn format_position(position: &Position) -> String {
    format!(
        "- {} (stance: {}, confidence: {:.2}): {}",
        position.agent_id,
        position.stance,
        position.confidence,
        truncate_str(&position.rationale, RATIONALE_EXCERPT_BYTES)
    )
}

fn push_positions(buffer: &mut String, positions: &[Position]) {
    for position in positions {
        buffer.push_str(&format_position(position));
        buffer.push('\n');
    }
}
