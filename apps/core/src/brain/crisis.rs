//! Always-on crisis phrase scan.
//!
//! Two ordered tiers: "immediate" fires on explicit self-harm or suicide
//! phrases, "concerning" needs several distinct distress phrases before it
//! fires. Assessment is pure: same text, same answer, no history.

use crate::brain::intent::tokenize;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use validator::Validate;

/// Severity produced by the crisis scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisTier {
    Immediate,
    Concerning,
}

impl fmt::Display for CrisisTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrisisTier::Immediate => write!(f, "immediate"),
            CrisisTier::Concerning => write!(f, "concerning"),
        }
    }
}

/// Phrase set and number of distinct phrase hits needed to fire one tier
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CrisisTierConfig {
    #[validate(length(min = 1))]
    pub phrases: Vec<String>,
    #[validate(range(min = 1))]
    pub threshold: usize,
}

impl CrisisTierConfig {
    pub fn new(phrases: &[&str], threshold: usize) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            threshold,
        }
    }
}

/// Both crisis tiers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CrisisConfig {
    #[validate(nested)]
    pub immediate: CrisisTierConfig,
    #[validate(nested)]
    pub concerning: CrisisTierConfig,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            immediate: CrisisTierConfig::new(
                &[
                    "kill myself",
                    "end my life",
                    "suicide plan",
                    "want to die",
                    "suicide",
                    "suicidal",
                    "killing myself",
                    "end it all",
                    "harm myself",
                ],
                1,
            ),
            concerning: CrisisTierConfig::new(
                &[
                    "can't go on",
                    "no reason to live",
                    "better off dead",
                    "don't want to exist",
                    "no way out",
                    "can't take it anymore",
                ],
                2,
            ),
        }
    }
}

/// A tier with its phrases pre-normalised to padded token strings
#[derive(Debug, Clone)]
struct CompiledTier {
    tier: CrisisTier,
    phrases: Vec<String>,
    threshold: usize,
}

impl CompiledTier {
    fn compile(tier: CrisisTier, config: &CrisisTierConfig) -> Result<Self, AppError> {
        let mut phrases: Vec<String> = config
            .phrases
            .iter()
            .map(|p| normalise(p))
            .filter(|p| !p.trim().is_empty())
            .collect();
        phrases.sort();
        phrases.dedup();

        if phrases.is_empty() {
            return Err(AppError::Config(format!("Crisis tier '{}' has no phrases", tier)));
        }
        if config.threshold == 0 {
            return Err(AppError::Config(format!(
                "Crisis tier '{}' threshold must be at least 1",
                tier
            )));
        }
        if config.threshold > phrases.len() {
            return Err(AppError::Config(format!(
                "Crisis tier '{}' threshold {} exceeds its {} distinct phrases",
                tier,
                config.threshold,
                phrases.len()
            )));
        }

        Ok(Self {
            tier,
            phrases,
            threshold: config.threshold,
        })
    }

    fn hits(&self, padded: &str) -> usize {
        self.phrases.iter().filter(|p| padded.contains(p.as_str())).count()
    }
}

/// Lowercase word tokens joined by single spaces and padded at both ends, so
/// `contains` only matches on whole words.
fn normalise(text: &str) -> String {
    let text = text.replace(['\u{2019}', '\u{2018}'], "'");
    format!(" {} ", tokenize(&text).join(" "))
}

/// Crisis detector over configurable tiers
#[derive(Debug, Clone)]
pub struct CrisisDetector {
    tiers: [CompiledTier; 2],
}

impl CrisisDetector {
    /// Build a detector. An empty tier or a zero threshold is a configuration fault.
    pub fn new(config: &CrisisConfig) -> Result<Self, AppError> {
        Ok(Self {
            tiers: [
                CompiledTier::compile(CrisisTier::Immediate, &config.immediate)?,
                CompiledTier::compile(CrisisTier::Concerning, &config.concerning)?,
            ],
        })
    }

    /// Highest tier whose threshold the text reaches, if any
    pub fn assess(&self, text: &str) -> Option<CrisisTier> {
        let padded = normalise(text);
        if padded.trim().is_empty() {
            return None;
        }
        self.tiers.iter().find_map(|tier| {
            let hits = tier.hits(&padded);
            if hits >= tier.threshold {
                warn!(tier = %tier.tier, hits, "Crisis language detected");
                Some(tier.tier)
            } else {
                None
            }
        })
    }

    /// True only for the immediate tier
    pub fn is_emergency(&self, text: &str) -> bool {
        self.assess(text) == Some(CrisisTier::Immediate)
    }
}

impl Default for CrisisDetector {
    fn default() -> Self {
        // NOTE: expect() is acceptable here: the built-in tiers are constants.
        Self::new(&CrisisConfig::default()).expect("Invalid built-in crisis tiers")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_single_phrase() {
        let detector = CrisisDetector::default();
        assert_eq!(detector.assess("I want to kill myself"), Some(CrisisTier::Immediate));
        assert_eq!(detector.assess("I WANT TO DIE."), Some(CrisisTier::Immediate));
        assert!(detector.is_emergency("thinking about suicide"));
    }

    #[test]
    fn test_concerning_needs_two_distinct_phrases() {
        let detector = CrisisDetector::default();
        assert_eq!(detector.assess("I can't go on like this"), None);
        assert_eq!(
            detector.assess("I can't go on like this, I can't go on"),
            None,
            "repeating one phrase is a single distinct hit"
        );
        assert_eq!(
            detector.assess("I can't go on, there's no reason to live"),
            Some(CrisisTier::Concerning)
        );
        assert!(!detector.is_emergency("I can't go on, there's no reason to live"));
    }

    #[test]
    fn test_curly_apostrophes_are_normalised() {
        let detector = CrisisDetector::default();
        assert_eq!(
            detector.assess("I can\u{2019}t go on and I\u{2019}m better off dead"),
            Some(CrisisTier::Concerning)
        );
    }

    #[test]
    fn test_whole_word_matching() {
        let detector = CrisisDetector::default();
        assert_eq!(detector.assess("the suicides of characters in the novel"), None);
        assert_eq!(detector.assess(""), None);
        assert_eq!(detector.assess("I had a nice day"), None);
    }

    #[test]
    fn test_assess_is_idempotent() {
        let detector = CrisisDetector::default();
        let text = "sometimes I want to die";
        assert_eq!(detector.assess(text), detector.assess(text));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = CrisisConfig {
            immediate: CrisisTierConfig::new(&["kill myself"], 1),
            concerning: CrisisTierConfig::new(&["tired", "alone", "empty"], 3),
        };
        let detector = CrisisDetector::new(&config).unwrap();
        assert_eq!(detector.assess("tired and alone"), None);
        assert_eq!(detector.assess("tired, alone and empty"), Some(CrisisTier::Concerning));
    }

    #[test]
    fn test_invalid_tiers_are_config_errors() {
        let empty = CrisisConfig {
            immediate: CrisisTierConfig::new(&[], 1),
            concerning: CrisisTierConfig::new(&["a b"], 1),
        };
        assert!(matches!(CrisisDetector::new(&empty), Err(AppError::Config(_))));

        let zero = CrisisConfig {
            immediate: CrisisTierConfig::new(&["kill myself"], 0),
            concerning: CrisisTierConfig::new(&["a b"], 1),
        };
        assert!(matches!(CrisisDetector::new(&zero), Err(AppError::Config(_))));

        let too_high = CrisisConfig {
            immediate: CrisisTierConfig::new(&["kill myself"], 1),
            concerning: CrisisTierConfig::new(&["a b"], 2),
        };
        assert!(matches!(CrisisDetector::new(&too_high), Err(AppError::Config(_))));
    }
}
