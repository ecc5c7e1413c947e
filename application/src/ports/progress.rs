//! Progress notification port
//!
//! Defines the interface for reporting progress while a debate runs.

use agora_domain::{AgentId, Phase};

/// Callback for progress updates during debate execution
///
/// Implementations live outside this crate and can surface progress any
/// way they like (console, UI, metrics). Callbacks fire from the phase
/// collection loop, never from inside a dispatch task.
pub trait DebateProgress: Send + Sync {
    /// Called when a round starts
    fn on_round_start(&self, round: u32);

    /// Called when a phase begins dispatching
    fn on_phase_start(&self, round: u32, phase: Phase, dispatches: usize);

    /// Called when one participant's dispatch settles.
    /// `responded` is false for timeouts and errors.
    fn on_agent_complete(&self, phase: Phase, agent: &AgentId, responded: bool);

    /// Called when a phase completes
    fn on_phase_complete(&self, round: u32, phase: Phase);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl DebateProgress for NoProgress {
    fn on_round_start(&self, _round: u32) {}
    fn on_phase_start(&self, _round: u32, _phase: Phase, _dispatches: usize) {}
    fn on_agent_complete(&self, _phase: Phase, _agent: &AgentId, _responded: bool) {}
    fn on_phase_complete(&self, _round: u32, _phase: Phase) {}
}
