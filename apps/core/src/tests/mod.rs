//! Test Module
//!
//! Cross-module suites for the Solace engine.
//!
//! ## Test Categories
//! - `brain_tests`: classification, crisis, prediction and selection working together
//! - `orchestrator_tests`: the façade with mocked safety and intent checks
//! - `chaos_test`: concurrency, failing components and reload under load
//! - `integration_tests`: end-to-end scenarios against files on disk

pub mod chaos_test;

use crate::actors::orchestrator::{ChatOrchestrator, Engine};
use crate::brain::crisis::CrisisDetector;
use crate::brain::intent::IntentIndex;
use crate::brain::predictor::StatisticalIntentPredictor;
use crate::brain::selector::ResponseSelector;
use crate::config::EngineConfig;
use std::sync::Arc;

/// The bundled intent definitions
pub(crate) const INTENTS: &str = include_str!("../../data/config/intent_mapping.json");

pub(crate) fn test_config() -> EngineConfig {
    EngineConfig {
        seed: Some(7),
        ..EngineConfig::default()
    }
}

pub(crate) fn test_index() -> Arc<IntentIndex> {
    Arc::new(IntentIndex::from_json(INTENTS).unwrap())
}

/// Engine over the bundled intents with the keyword-only predictor
pub(crate) fn test_engine(config: &EngineConfig) -> Engine {
    Engine::assemble(
        config,
        test_index(),
        Arc::new(StatisticalIntentPredictor::fallback_only()),
        Arc::new(CrisisDetector::default()),
        ResponseSelector::new(config.selector()),
    )
}

pub(crate) fn ready_orchestrator(config: EngineConfig) -> ChatOrchestrator {
    let engine = test_engine(&config);
    ChatOrchestrator::with_engine(config, engine)
}
