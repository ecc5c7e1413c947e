//! Position ledger - append-only record of every submission in a debate
//!
//! The ledger is the only mutable structure shared between concurrent
//! dispatch tasks. All operations are plain memory work under a single
//! lock; nothing performs I/O or blocks while the lock is held, so a slow
//! agent can never stall unrelated ledger calls.

use crate::debate::phase::Phase;
use crate::debate::value_objects::Position;
use crate::participant::AgentId;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors raised by ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("duplicate submission for agent {agent_id} in round {round} {phase}")]
    DuplicateSubmission {
        round: u32,
        phase: Phase,
        agent_id: AgentId,
    },
}

#[derive(Default)]
struct LedgerInner {
    entries: Vec<Position>,
    seen: HashSet<(u32, Phase, AgentId)>,
}

/// Append-only, concurrency-safe store of debate positions
///
/// At most one position exists per (round, phase, agent); the
/// check-and-append is atomic per key. Submission order is preserved for
/// auditing.
#[derive(Default)]
pub struct PositionLedger {
    inner: Mutex<LedgerInner>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        // The ledger holds only owned data, which stays consistent even if
        // a recording thread panicked mid-call.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a position. Fails if the same (round, phase, agent) key was
    /// already recorded.
    pub fn record(&self, position: Position) -> Result<(), LedgerError> {
        let key = (position.round, position.phase, position.agent_id.clone());
        let mut inner = self.lock();
        if !inner.seen.insert(key) {
            return Err(LedgerError::DuplicateSubmission {
                round: position.round,
                phase: position.phase,
                agent_id: position.agent_id,
            });
        }
        inner.entries.push(position);
        Ok(())
    }

    /// All positions of one phase of one round, in submission order.
    pub fn get(&self, round: u32, phase: Phase) -> Vec<Position> {
        self.lock()
            .entries
            .iter()
            .filter(|p| p.round == round && p.phase == phase)
            .cloned()
            .collect()
    }

    /// The position an agent recorded for one (round, phase), if any.
    pub fn find(&self, round: u32, phase: Phase, agent: &AgentId) -> Option<Position> {
        self.lock()
            .entries
            .iter()
            .find(|p| p.round == round && p.phase == phase && &p.agent_id == agent)
            .cloned()
    }

    /// The most recently recorded position of an agent, if any.
    pub fn latest(&self, agent: &AgentId) -> Option<Position> {
        self.lock()
            .entries
            .iter()
            .rev()
            .find(|p| &p.agent_id == agent)
            .cloned()
    }

    /// The full trace, in submission order.
    pub fn snapshot(&self) -> Vec<Position> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
