use crate::actors::messages::AppError;
use crate::brain::crisis::{CrisisDetector, CrisisTier};
use crate::brain::resolver::{IntentResolver, ResolvedIntent};
use async_trait::async_trait;
use std::sync::Arc;

/// Defines the per-message safety check run before every response.
///
/// Implementations must not depend on conversation history: the same text
/// always gets the same answer.
#[async_trait]
pub trait SafetyCheck: Send + Sync + 'static {
    /// Assess a message for crisis language.
    async fn assess(&self, text: String) -> Result<Option<CrisisTier>, AppError>;
}

/// Defines the per-message intent prediction.
#[async_trait]
pub trait IntentPredictor: Send + Sync + 'static {
    /// Predict the intent of a message, or `None` when nothing matches.
    async fn predict(&self, text: String) -> Result<Option<ResolvedIntent>, AppError>;
}

/// Crisis detector run on the blocking pool
pub struct CrisisSafetyCheck {
    detector: Arc<CrisisDetector>,
}

impl CrisisSafetyCheck {
    pub fn new(detector: Arc<CrisisDetector>) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl SafetyCheck for CrisisSafetyCheck {
    async fn assess(&self, text: String) -> Result<Option<CrisisTier>, AppError> {
        let detector = Arc::clone(&self.detector);
        Ok(tokio::task::spawn_blocking(move || detector.assess(&text)).await?)
    }
}

/// Ranked intent resolver run on the blocking pool
pub struct ResolverPredictor {
    resolver: Arc<IntentResolver>,
}

impl ResolverPredictor {
    pub fn new(resolver: Arc<IntentResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl IntentPredictor for ResolverPredictor {
    async fn predict(&self, text: String) -> Result<Option<ResolvedIntent>, AppError> {
        let resolver = Arc::clone(&self.resolver);
        Ok(tokio::task::spawn_blocking(move || resolver.resolve(&text)).await?)
    }
}
