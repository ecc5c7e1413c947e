//! Scripted agent gateway
//!
//! A deterministic [`AgentGateway`] driven by per-agent scripts. Each call
//! consumes the agent's next scripted turn; the final turn repeats forever,
//! so short scripts cover arbitrarily long debates. Used to exercise the
//! full protocol without live agents.

use agora_application::ports::agent_gateway::{AgentError, AgentGateway, AgentReply};
use agora_domain::{AgentId, AgentPrompt, Participant};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// One scripted response from an agent
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Answer immediately
    Reply {
        stance: String,
        confidence: f64,
        rationale: String,
    },
    /// Answer after a delay (which may or may not beat the phase timeout)
    DelayedReply {
        delay: Duration,
        stance: String,
        confidence: f64,
        rationale: String,
    },
    /// Fail the request
    Fail(String),
    /// Never answer within any phase window
    Silent,
}

impl ScriptedTurn {
    pub fn reply(stance: impl Into<String>, confidence: f64) -> Self {
        ScriptedTurn::Reply {
            stance: stance.into(),
            confidence,
            rationale: "scripted reply".to_string(),
        }
    }

    pub fn delayed(delay: Duration, stance: impl Into<String>, confidence: f64) -> Self {
        ScriptedTurn::DelayedReply {
            delay,
            stance: stance.into(),
            confidence,
            rationale: "scripted reply".to_string(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        ScriptedTurn::Fail(reason.into())
    }
}

/// Agent gateway that replays per-agent scripts
///
/// Agents without a script behave like unreachable ones and fail every
/// request.
#[derive(Default)]
pub struct ScriptedAgentGateway {
    scripts: Mutex<HashMap<AgentId, VecDeque<ScriptedTurn>>>,
}

impl ScriptedAgentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script for one agent. The last turn repeats once the script
    /// is exhausted.
    pub fn script(self, agent: impl Into<AgentId>, turns: Vec<ScriptedTurn>) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(agent.into(), VecDeque::from(turns));
        self
    }

    fn next_turn(&self, agent: &AgentId) -> Option<ScriptedTurn> {
        let mut scripts = self
            .scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let queue = scripts.get_mut(agent)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl AgentGateway for ScriptedAgentGateway {
    async fn respond(
        &self,
        participant: &Participant,
        _prompt: &AgentPrompt,
    ) -> Result<AgentReply, AgentError> {
        // The lock is released before any sleeping happens
        let turn = self.next_turn(participant.id());
        debug!(agent = %participant.id(), ?turn, "scripted dispatch");

        match turn {
            Some(ScriptedTurn::Reply {
                stance,
                confidence,
                rationale,
            }) => Ok(AgentReply::new(stance, confidence, rationale)),
            Some(ScriptedTurn::DelayedReply {
                delay,
                stance,
                confidence,
                rationale,
            }) => {
                tokio::time::sleep(delay).await;
                Ok(AgentReply::new(stance, confidence, rationale))
            }
            Some(ScriptedTurn::Fail(reason)) => Err(AgentError::RequestFailed(reason)),
            Some(ScriptedTurn::Silent) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AgentError::Timeout)
            }
            None => Err(AgentError::Unavailable(format!(
                "no script for agent {}",
                participant.id()
            ))),
        }
    }
}
