use crate::brain::context::{ConversationSummary, ConversationTurn, DialoguePhase};
use crate::brain::crisis::CrisisTier;
use serde::Serialize;
use tokio::sync::oneshot;

/// Defines errors that can occur within the actor system.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// The session actor has stopped (evicted or crashed) and no longer accepts messages.
    #[error("Session actor unavailable: {0}")]
    SessionClosed(String),
    /// A generic internal error within an actor.
    #[error("Internal system error: {0}")]
    Internal(String),
    /// An error indicating that an actor operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<tokio::time::error::Elapsed> for ActorError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ActorError::Timeout(format!("Actor operation timed out: {}", err))
    }
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// Messages that can be sent to a `SessionActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// Generate a reply with checks already computed by the orchestrator.
    Generate {
        text: String,
        crisis: Option<CrisisTier>,
        intent: Option<String>,
        /// A channel to send the reply back.
        responder: oneshot::Sender<Result<String, AppError>>,
    },
    /// Record a message that was answered by the emergency short-circuit.
    RecordEmergency {
        text: String,
        reply: String,
        responder: oneshot::Sender<()>,
    },
    /// Read-only session report.
    Summary {
        responder: oneshot::Sender<ConversationSummary>,
    },
    /// The bounded turn history, oldest first.
    History {
        responder: oneshot::Sender<Vec<ConversationTurn>>,
    },
    /// Leave the CRISIS phase; replies with the resulting phase.
    ResetCrisis {
        responder: oneshot::Sender<DialoguePhase>,
    },
}
