//! Ranked intent resolution.
//!
//! Strategies are tried in order until one produces an intent: confident
//! pattern match, then the statistical model, then keyword matching. A
//! strategy error is logged and the next strategy is tried.

use crate::brain::intent::{IntentIndex, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::brain::predictor::StatisticalIntentPredictor;
use crate::error::AppError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which strategy produced an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Pattern,
    Statistical,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedIntent {
    pub tag: String,
    /// Present for pattern and keyword matches
    pub confidence: Option<f32>,
    pub source: IntentSource,
}

/// One way of turning text into an intent tag.
///
/// `Ok(None)` means "no opinion, try the next strategy".
pub trait IntentStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, text: &str) -> Result<Option<ResolvedIntent>, AppError>;
}

/// Accepts pattern matches at or above the confidence threshold
pub struct PatternStrategy {
    index: Arc<IntentIndex>,
    threshold: f32,
}

impl PatternStrategy {
    pub fn new(index: Arc<IntentIndex>, threshold: f32) -> Self {
        Self { index, threshold }
    }
}

impl IntentStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn resolve(&self, text: &str) -> Result<Option<ResolvedIntent>, AppError> {
        let result = self.index.classify(text);
        Ok(result
            .tag()
            .filter(|_| result.confidence >= self.threshold)
            .map(|tag| ResolvedIntent {
                tag: tag.to_string(),
                confidence: Some(result.confidence),
                source: IntentSource::Pattern,
            }))
    }
}

/// Statistical model prediction, without its keyword fallback
pub struct StatisticalStrategy {
    predictor: Arc<StatisticalIntentPredictor>,
}

impl StatisticalStrategy {
    pub fn new(predictor: Arc<StatisticalIntentPredictor>) -> Self {
        Self { predictor }
    }
}

impl IntentStrategy for StatisticalStrategy {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn resolve(&self, text: &str) -> Result<Option<ResolvedIntent>, AppError> {
        Ok(self.predictor.try_predict(text)?.map(|tag| ResolvedIntent {
            tag,
            confidence: None,
            source: IntentSource::Statistical,
        }))
    }
}

/// Loose matching: any pattern result regardless of confidence, then the
/// predictor's static keyword table
pub struct KeywordStrategy {
    index: Arc<IntentIndex>,
}

impl KeywordStrategy {
    pub fn new(index: Arc<IntentIndex>) -> Self {
        Self { index }
    }
}

impl IntentStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn resolve(&self, text: &str) -> Result<Option<ResolvedIntent>, AppError> {
        let result = self.index.classify(text);
        if let Some(tag) = result.tag() {
            return Ok(Some(ResolvedIntent {
                tag: tag.to_string(),
                confidence: Some(result.confidence),
                source: IntentSource::Keyword,
            }));
        }
        Ok(StatisticalIntentPredictor::fallback_predict(&text.to_lowercase()).map(|tag| {
            ResolvedIntent {
                tag,
                confidence: None,
                source: IntentSource::Keyword,
            }
        }))
    }
}

/// Ordered list of intent strategies
pub struct IntentResolver {
    strategies: Vec<Box<dyn IntentStrategy>>,
}

impl IntentResolver {
    pub fn new(strategies: Vec<Box<dyn IntentStrategy>>) -> Self {
        Self { strategies }
    }

    /// Pattern -> statistical -> keyword
    pub fn standard(
        index: Arc<IntentIndex>,
        predictor: Arc<StatisticalIntentPredictor>,
        threshold: f32,
    ) -> Self {
        Self::new(vec![
            Box::new(PatternStrategy::new(Arc::clone(&index), threshold)),
            Box::new(StatisticalStrategy::new(predictor)),
            Box::new(KeywordStrategy::new(index)),
        ])
    }

    pub fn with_default_threshold(
        index: Arc<IntentIndex>,
        predictor: Arc<StatisticalIntentPredictor>,
    ) -> Self {
        Self::standard(index, predictor, DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn resolve(&self, text: &str) -> Option<ResolvedIntent> {
        for strategy in &self.strategies {
            match strategy.resolve(text) {
                Ok(Some(resolved)) => {
                    debug!(strategy = strategy.name(), tag = %resolved.tag, "Intent resolved");
                    return Some(resolved);
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!("Intent strategy '{}' failed: {}", strategy.name(), e);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::predictor::IntentModel;

    const INTENTS: &str = include_str!("../../data/config/intent_mapping.json");

    struct FixedModel(&'static str);

    impl IntentModel for FixedModel {
        fn predict(&self, _text: &str) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl IntentStrategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn resolve(&self, _text: &str) -> Result<Option<ResolvedIntent>, AppError> {
            Err(AppError::Prediction("boom".to_string()))
        }
    }

    fn index() -> Arc<IntentIndex> {
        Arc::new(IntentIndex::from_json(INTENTS).unwrap())
    }

    #[test]
    fn test_confident_pattern_wins() {
        let predictor = Arc::new(
            StatisticalIntentPredictor::with_model(Box::new(FixedModel("general"))).unwrap(),
        );
        let resolver = IntentResolver::with_default_threshold(index(), predictor);
        let resolved = resolver.resolve("I want to kill myself").unwrap();
        assert_eq!(resolved.tag, "suicide_risk");
        assert_eq!(resolved.source, IntentSource::Pattern);
        assert_eq!(resolved.confidence, Some(1.0));
    }

    #[test]
    fn test_low_confidence_defers_to_model() {
        let predictor = Arc::new(
            StatisticalIntentPredictor::with_model(Box::new(FixedModel("greeting"))).unwrap(),
        );
        let resolver = IntentResolver::with_default_threshold(index(), predictor);
        let resolved = resolver.resolve("hello").unwrap();
        assert_eq!(resolved.source, IntentSource::Statistical);
        assert_eq!(resolved.tag, "greeting");
    }

    #[test]
    fn test_missing_model_falls_to_keywords() {
        let predictor = Arc::new(StatisticalIntentPredictor::fallback_only());
        let resolver = IntentResolver::with_default_threshold(index(), predictor);

        let resolved = resolver.resolve("hello").unwrap();
        assert_eq!(resolved.source, IntentSource::Keyword);
        assert_eq!(resolved.tag, "greeting");

        let table = resolver.resolve("I worry constantly").unwrap();
        assert_eq!(table.tag, "anxiety");
        assert_eq!(table.confidence, None);

        assert_eq!(resolver.resolve("the weather is grey"), None);
    }

    #[test]
    fn test_failing_strategy_is_skipped() {
        let resolver = IntentResolver::new(vec![
            Box::new(Failing),
            Box::new(KeywordStrategy::new(index())),
        ]);
        assert_eq!(resolver.resolve("hey").unwrap().tag, "greeting");
    }

    #[test]
    fn test_empty_text_resolves_nothing() {
        let predictor = Arc::new(StatisticalIntentPredictor::fallback_only());
        let resolver = IntentResolver::with_default_threshold(index(), predictor);
        assert_eq!(resolver.resolve(""), None);
    }
}
