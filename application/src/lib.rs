//! Application layer for agora
//!
//! This crate contains the port definitions (agent gateway, progress) and
//! the use cases that drive a debate: the protocol engine's phase state
//! machine and the `RunDebate` orchestrator. It depends only on the domain
//! layer; concrete agent adapters live in the infrastructure layer.

pub mod ports;
pub mod protocol;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    agent_gateway::{AgentError, AgentGateway, AgentReply},
    progress::{DebateProgress, NoProgress},
};
pub use protocol::engine::{EngineOutcome, ProtocolEngine, ProtocolError};
pub use use_cases::run_debate::{RunDebateError, RunDebateInput, RunDebateUseCase};
