use std::io;
use thiserror::Error;

/// Engine-wide error type, consolidating all possible failures into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// The intent definition source or the engine configuration is unreadable or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A model artifact is missing, corrupt, or failed its load-time self-test.
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Vectorizing or classifying a text failed.
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Input had the wrong shape for the operation (e.g., empty text).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents errors specific to the actor system, such as a closed mailbox.
    #[error("Actor error: {0}")]
    Actor(#[from] crate::actors::messages::ActorError),

    /// Represents unexpected internal errors that indicate a bug.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Represents errors from operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::ModelLoad(s) => AppError::ModelLoad(s.clone()),
            AppError::Prediction(s) => AppError::Prediction(s.clone()),
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Actor(e) => AppError::Actor(e.clone()),
            AppError::Internal(s) => AppError::Internal(s.clone()),
            AppError::Timeout(s) => AppError::Timeout(s.clone()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Worker task failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation errors: {}", err))
    }
}
