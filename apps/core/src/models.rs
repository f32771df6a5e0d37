use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Top-level shape of an intent definition source.
///
/// Entries are kept as raw JSON values so that one malformed intent can be
/// skipped without rejecting the whole file.
#[derive(Debug, Deserialize)]
pub struct IntentFile {
    #[serde(default)]
    pub intents: Vec<Value>,
}

/// A single intent definition as it appears in the configuration source.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IntentDefinition {
    /// Unique key of the intent (e.g., "anxiety").
    #[validate(length(min = 1))]
    pub tag: String,
    /// Ordered surface patterns. At least one is required.
    #[validate(length(min = 1))]
    pub patterns: Vec<String>,
    /// Context tags the intent belongs to.
    #[serde(default)]
    pub context: Vec<String>,
    /// Priority, 1 and up. Priority 4 and above marks an emergency intent.
    #[serde(default = "default_priority")]
    #[validate(range(min = 1))]
    pub priority: u8,
    /// Sentiment label; unknown labels fall back to neutral.
    #[serde(default)]
    pub sentiment: Option<String>,
    /// Free-form metadata, may carry an `emergency_protocol` payload.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_priority() -> u8 {
    1
}
