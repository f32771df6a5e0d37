//! # Brain Module
//!
//! Text analysis and response selection for Solace. Everything here is
//! synchronous and CPU-bound; the actor layer decides where it runs.
//!
//! ## Components
//! - `intent`: Pattern intent index with emergency tier (fast path)
//! - `vectorizer` / `predictor`: Statistical intent model with keyword fallback
//! - `resolver`: Ranked strategy list over the two classifiers
//! - `crisis`: Always-on crisis phrase scan
//! - `sentiment`: Lexicon sentiment score
//! - `context`: Per-session dialogue state machine
//! - `library`: Response templates and resources
//! - `selector` / `generator`: Response selection pipeline

pub mod context;
pub mod crisis;
pub mod generator;
pub mod intent;
pub mod library;
pub mod predictor;
pub mod resolver;
pub mod selector;
pub mod sentiment;
pub mod vectorizer;

pub use context::{ConversationSummary, ConversationTurn, DialogueContext, DialoguePhase, UserFacts};
pub use crisis::{CrisisConfig, CrisisDetector, CrisisTier};
pub use generator::ResponseGenerator;
pub use intent::{ClassificationResult, Intent, IntentIndex, Sentiment};
pub use predictor::{PredictorMetrics, StatisticalIntentPredictor};
pub use resolver::{IntentResolver, ResolvedIntent};
pub use selector::{ResponseSelector, SelectorConfig};
