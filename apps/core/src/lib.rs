//! Solace core: the support-chat engine.
//!
//! Turns free-form user text into a safe reply. Crisis language is always
//! answered with a fixed, resource-bearing message; everything else goes
//! through intent resolution and a small dialogue state machine.

pub mod actors;
pub mod brain;
pub mod config;
pub mod error;
pub mod fs_manager;
pub mod models;
pub mod preflight;

#[cfg(test)]
mod tests;

pub use actors::orchestrator::{ChatOrchestrator, Readiness};
pub use config::EngineConfig;
pub use error::AppError;
