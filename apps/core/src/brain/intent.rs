//! Intent Classification using compiled literal patterns.
//!
//! Intents are loaded from a JSON definition source and compiled once into
//! case-insensitive, boundary-anchored matchers. Emergency intents (priority 4
//! and above) are always scanned first and win outright with confidence 1.0.
//! No ML model required - pure Rust regex matching.

use crate::error::AppError;
use crate::models::{IntentDefinition, IntentFile};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::{error, info, warn};
use validator::Validate;

/// Priority at which an intent becomes emergency-tier.
pub const EMERGENCY_PRIORITY: u8 = 4;

/// Best pattern score below which the keyword fallback is attempted.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Fixed confidence reported for keyword fallback matches.
pub const KEYWORD_FALLBACK_CONFIDENCE: f32 = 0.5;

/// Pattern length (in characters) that earns full specificity.
const SPECIFICITY_SCALE: f32 = 25.0;

/// Bonus when the whole message is exactly the pattern.
const EXACT_MATCH_BONUS: f32 = 0.2;

// NOTE: expect() is acceptable here: the pattern is a compile-time constant.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w']+").expect("Invalid regex: token pattern"));

/// Sentiment classification attached to an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    ExtremeNegative,
}

impl Sentiment {
    /// Parse a configuration label ("positive", "extreme_negative", "extreme-negative", ...)
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().replace('-', "_").as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            "extreme_negative" => Some(Sentiment::ExtremeNegative),
            _ => None,
        }
    }
}

/// A named category of user communicative purpose
#[derive(Debug, Clone, Serialize)]
pub struct Intent {
    pub tag: String,
    pub patterns: Vec<String>,
    pub context: BTreeSet<String>,
    pub priority: u8,
    pub sentiment: Sentiment,
    pub metadata: Map<String, Value>,
}

impl Intent {
    /// Emergency intents are checked before all others and never filtered.
    pub fn is_emergency(&self) -> bool {
        self.priority >= EMERGENCY_PRIORITY
    }

    fn from_definition(def: IntentDefinition) -> Self {
        let sentiment = match def.sentiment.as_deref() {
            None => Sentiment::Neutral,
            Some(label) => Sentiment::parse(label).unwrap_or_else(|| {
                warn!(
                    "Invalid sentiment '{}' for intent {}, defaulting to neutral",
                    label, def.tag
                );
                Sentiment::Neutral
            }),
        };

        Self {
            tag: def.tag,
            patterns: def.patterns,
            context: def.context.into_iter().collect(),
            priority: def.priority,
            sentiment,
            metadata: def.metadata,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)
    }
}

/// A boundary-anchored matcher compiled from one intent pattern
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    literal: String,
    tokens: Vec<String>,
    regex: Regex,
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let literal = pattern.trim().to_lowercase();
        let regex = Regex::new(&format!(r"(?i)(?:^|\W){}(?:$|\W)", regex::escape(&literal)))?;
        Ok(Self {
            tokens: tokenize(&literal),
            literal,
            regex,
        })
    }

    /// The lowercased pattern text this matcher was built from
    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Specificity score of a match on `text`, capped at 1.0.
    fn score(&self, text: &str) -> f32 {
        let mut score = (self.literal.chars().count() as f32 / SPECIFICITY_SCALE).min(1.0);
        if text == self.literal {
            score += EXACT_MATCH_BONUS;
        }
        score.min(1.0)
    }

    /// Loose match: every word of the pattern appears somewhere in the text.
    fn keywords_present(&self, words: &HashSet<String>) -> bool {
        !self.tokens.is_empty() && self.tokens.iter().all(|t| words.contains(t))
    }
}

/// Result of intent classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Matched intent, if any
    pub intent: Option<Arc<Intent>>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    /// Pattern that produced the match
    pub matched_pattern: Option<String>,
}

impl ClassificationResult {
    fn none() -> Self {
        Self {
            intent: None,
            confidence: 0.0,
            matched_pattern: None,
        }
    }

    fn matched(intent: &Arc<Intent>, confidence: f32, pattern: &CompiledPattern) -> Self {
        Self {
            intent: Some(Arc::clone(intent)),
            confidence: confidence.clamp(0.0, 1.0),
            matched_pattern: Some(pattern.literal.clone()),
        }
    }

    /// Tag of the matched intent
    pub fn tag(&self) -> Option<&str> {
        self.intent.as_deref().map(|i| i.tag.as_str())
    }
}

/// Immutable, fully compiled view of one loaded intent set.
#[derive(Debug)]
struct IndexSnapshot {
    intents: Vec<Arc<Intent>>,
    compiled: Vec<Vec<CompiledPattern>>,
    by_tag: HashMap<String, usize>,
    /// Emergency intents, highest priority first
    emergency: Vec<usize>,
    regular: Vec<usize>,
    /// All intents, highest priority first, for the keyword fallback
    fallback_order: Vec<usize>,
}

impl IndexSnapshot {
    fn parse(json: &str) -> Result<Self, AppError> {
        let file: IntentFile = serde_json::from_str(json)?;

        let mut intents: Vec<Arc<Intent>> = Vec::new();
        let mut compiled = Vec::new();
        let mut by_tag = HashMap::new();

        for (position, raw) in file.intents.into_iter().enumerate() {
            let def: IntentDefinition = match serde_json::from_value(raw) {
                Ok(def) => def,
                Err(e) => {
                    error!("Skipping invalid intent configuration #{}: {}", position, e);
                    continue;
                }
            };
            if let Err(e) = def.validate() {
                error!("Skipping invalid intent '{}': {}", def.tag, e);
                continue;
            }
            if by_tag.contains_key(&def.tag) {
                warn!("Skipping duplicate intent tag '{}'", def.tag);
                continue;
            }

            let mut patterns = Vec::with_capacity(def.patterns.len());
            for pattern in &def.patterns {
                match CompiledPattern::compile(pattern) {
                    Ok(p) if !p.literal.is_empty() => patterns.push(p),
                    Ok(_) => warn!("Ignoring blank pattern for intent {}", def.tag),
                    Err(e) => warn!("Invalid pattern '{}' for intent {}: {}", pattern, def.tag, e),
                }
            }

            by_tag.insert(def.tag.clone(), intents.len());
            intents.push(Arc::new(Intent::from_definition(def)));
            compiled.push(patterns);
        }

        if intents.is_empty() {
            return Err(AppError::Config(
                "No valid intents found in configuration".to_string(),
            ));
        }

        let by_priority = |ids: &mut Vec<usize>| {
            ids.sort_by(|a, b| intents[*b].priority.cmp(&intents[*a].priority).then(a.cmp(b)));
        };
        let (mut emergency, regular): (Vec<usize>, Vec<usize>) =
            (0..intents.len()).partition(|i| intents[*i].is_emergency());
        by_priority(&mut emergency);
        let mut fallback_order: Vec<usize> = (0..intents.len()).collect();
        by_priority(&mut fallback_order);

        Ok(Self {
            intents,
            compiled,
            by_tag,
            emergency,
            regular,
            fallback_order,
        })
    }

    fn classify(&self, text: &str, threshold: f32) -> ClassificationResult {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return ClassificationResult::none();
        }

        // Emergency tier first: first hit wins outright.
        for &id in &self.emergency {
            if let Some(pattern) = self.compiled[id].iter().find(|p| p.is_match(&text)) {
                return ClassificationResult::matched(&self.intents[id], 1.0, pattern);
            }
        }

        let mut best: Option<(usize, &CompiledPattern, f32)> = None;
        for &id in &self.regular {
            for pattern in &self.compiled[id] {
                if !pattern.is_match(&text) {
                    continue;
                }
                let score = pattern.score(&text);
                if best.map_or(true, |(_, _, s)| score > s) {
                    best = Some((id, pattern, score));
                }
            }
        }

        if best.map_or(true, |(_, _, s)| s < threshold) {
            if let Some(result) = self.keyword_fallback(&text) {
                return result;
            }
        }

        match best {
            Some((id, pattern, score)) => ClassificationResult::matched(&self.intents[id], score, pattern),
            None => ClassificationResult::none(),
        }
    }

    /// Last-resort match at fixed confidence. Pattern words must appear as
    /// whole words, not substrings, so "hi" never matches inside "this".
    fn keyword_fallback(&self, text: &str) -> Option<ClassificationResult> {
        let words: HashSet<String> = tokenize(text).into_iter().collect();
        self.fallback_order.iter().find_map(|&id| {
            self.compiled[id]
                .iter()
                .find(|p| p.keywords_present(&words))
                .map(|p| ClassificationResult::matched(&self.intents[id], KEYWORD_FALLBACK_CONFIDENCE, p))
        })
    }
}

/// Pattern-based intent index with atomic reload
pub struct IntentIndex {
    source: Option<PathBuf>,
    threshold: f32,
    snapshot: RwLock<Arc<IndexSnapshot>>,
}

impl fmt::Debug for IntentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentIndex")
            .field("source", &self.source)
            .field("intents", &self.len())
            .finish()
    }
}

impl IntentIndex {
    /// Load and compile intents from a JSON definition file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let snapshot = Self::read_snapshot(path)?;
        info!(
            "Loaded {} intents ({} emergency) from {:?}",
            snapshot.intents.len(),
            snapshot.emergency.len(),
            path
        );
        Ok(Self {
            source: Some(path.to_path_buf()),
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Build an index from an in-memory definition; such an index cannot be reloaded.
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        Ok(Self {
            source: None,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            snapshot: RwLock::new(Arc::new(IndexSnapshot::parse(json)?)),
        })
    }

    /// Override the pattern score under which the keyword fallback kicks in.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    fn read_snapshot(path: &Path) -> Result<IndexSnapshot, AppError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read intent source {:?}: {}", path, e))
        })?;
        IndexSnapshot::parse(&json)
    }

    fn current(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Classify the intent of a text
    pub fn classify(&self, text: &str) -> ClassificationResult {
        self.current().classify(text, self.threshold)
    }

    /// Reload the definition source, swapping in the new set all at once.
    ///
    /// Returns `false` and keeps the previous set when the source is unreadable or invalid.
    pub fn reload(&self) -> bool {
        let Some(path) = &self.source else {
            warn!("Intent index has no file source; reload skipped");
            return false;
        };

        match Self::read_snapshot(path) {
            Ok(snapshot) => {
                let count = snapshot.intents.len();
                *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
                info!("Reloaded {} intents from {:?}", count, path);
                true
            }
            Err(e) => {
                error!("Failed to refresh intents: {}", e);
                false
            }
        }
    }

    pub fn get(&self, tag: &str) -> Option<Arc<Intent>> {
        let snapshot = self.current();
        snapshot.by_tag.get(tag).map(|&id| Arc::clone(&snapshot.intents[id]))
    }

    /// All intents of the current set, in definition order
    pub fn intents(&self) -> Vec<Arc<Intent>> {
        self.current().intents.clone()
    }

    pub fn is_emergency_tag(&self, tag: &str) -> bool {
        self.get(tag).is_some_and(|i| i.is_emergency())
    }

    /// Emergency protocol payload of an emergency-tier intent
    pub fn emergency_protocol(&self, tag: &str) -> Option<Value> {
        self.get(tag)
            .filter(|i| i.is_emergency())
            .and_then(|i| i.metadata.get("emergency_protocol").cloned())
    }

    pub fn len(&self) -> usize {
        self.current().intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lowercased word tokens, apostrophes kept ("can't").
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED: &str = include_str!("../../data/config/intent_mapping.json");

    fn index() -> IntentIndex {
        IntentIndex::from_json(SHIPPED).unwrap()
    }

    #[test]
    fn test_emergency_detection() {
        let index = index();

        let result = index.classify("Sometimes I think I want to die");
        assert_eq!(result.tag(), Some("suicide_risk"));
        assert_eq!(result.confidence, 1.0);

        let result = index.classify("hello, I want to hurt myself");
        assert_eq!(result.tag(), Some("self_harm"));
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_emergency_wins_over_longer_regular_pattern() {
        let index = index();

        let result = index.classify("i feel depressed and i can't stop worrying, suicide is on my mind");
        assert_eq!(result.tag(), Some("suicide_risk"));
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_regular_pattern_scoring() {
        let index = index();

        let result = index.classify("Lately I can't stop worrying about work");
        assert_eq!(result.tag(), Some("anxiety"));
        assert!(result.confidence >= 0.7 && result.confidence <= 1.0);
        assert_eq!(result.matched_pattern.as_deref(), Some("i can't stop worrying"));
    }

    #[test]
    fn test_low_score_uses_keyword_fallback() {
        let index = index();

        let result = index.classify("hello");
        assert_eq!(result.tag(), Some("greeting"));
        assert_eq!(result.confidence, KEYWORD_FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_keyword_fallback_ignores_word_order() {
        let index = index();

        let result = index.classify("worrying, I just can't stop");
        assert_eq!(result.tag(), Some("anxiety"));
        assert_eq!(result.confidence, KEYWORD_FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_pattern_needs_word_boundary() {
        let index = index();

        // "hi" inside "this" is not a greeting
        let result = index.classify("this");
        assert!(result.intent.is_none());
    }

    #[test]
    fn test_unknown_detection() {
        let index = index();

        let result = index.classify("");
        assert!(result.intent.is_none());
        assert_eq!(result.confidence, 0.0);

        let result = index.classify("   ");
        assert!(result.intent.is_none());
        assert_eq!(result.confidence, 0.0);

        let result = index.classify("the weather report");
        assert!(result.intent.is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let index = index();
        assert_eq!(index.classify("I AM SO ANXIOUS").tag(), Some("anxiety"));
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let json = r#"{"intents": [
            {"patterns": ["no tag here"]},
            {"tag": "missing_patterns"},
            {"tag": "bad_priority", "patterns": ["x"], "priority": "high"},
            {"tag": "ok", "patterns": ["fine"], "sentiment": "ecstatic"}
        ]}"#;
        let index = IntentIndex::from_json(json).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("ok").unwrap().sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_zero_valid_intents_is_config_error() {
        let err = IntentIndex::from_json(r#"{"intents": [{"tag": "x"}]}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = IntentIndex::from_json("not json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = IntentIndex::load("/nonexistent/intent_mapping.json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_emergency_protocol_lookup() {
        let index = index();
        let protocol = index.emergency_protocol("suicide_risk").unwrap();
        assert_eq!(protocol["hotline"], "988");
        assert!(index.emergency_protocol("greeting").is_none());
        assert!(index.is_emergency_tag("self_harm"));
        assert!(!index.is_emergency_tag("anxiety"));
    }

    #[test]
    fn test_sentiment_labels() {
        assert_eq!(Sentiment::parse("EXTREME-NEGATIVE"), Some(Sentiment::ExtremeNegative));
        assert_eq!(Sentiment::parse("positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse("meh"), None);
    }

    #[test]
    fn test_in_memory_index_cannot_reload() {
        assert!(!index().reload());
    }
}
