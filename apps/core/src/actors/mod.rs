//! Async layer: the orchestrator façade, per-session actors and the seams
//! between them.

pub mod messages;
pub mod orchestrator;
pub mod session;
pub mod traits;
