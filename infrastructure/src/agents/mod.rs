//! Agent gateway adapters

pub mod scripted;
