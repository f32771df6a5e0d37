//! Lexicon sentiment scoring for user messages.

use crate::brain::intent::tokenize;

/// Positive lexicon
const POSITIVE_WORDS: &[&str] = &[
    "hope", "hopeful", "better", "improving", "progress", "happy", "relief", "grateful", "calm",
];

/// Negative lexicon
const NEGATIVE_WORDS: &[&str] = &[
    "hopeless", "worthless", "terrible", "awful", "hate", "despair", "miserable", "empty",
];

/// Score a message in [-1, 1]: `(pos - neg) / (pos + neg)`, or 0.0 when no
/// lexicon word occurs.
pub fn analyze_sentiment(text: &str) -> f32 {
    let (pos, neg) = tokenize(text).iter().fold((0u32, 0u32), |(pos, neg), word| {
        if POSITIVE_WORDS.contains(&word.as_str()) {
            (pos + 1, neg)
        } else if NEGATIVE_WORDS.contains(&word.as_str()) {
            (pos, neg + 1)
        } else {
            (pos, neg)
        }
    });

    let total = pos + neg;
    if total == 0 {
        return 0.0;
    }
    (pos as f32 - neg as f32) / total as f32
}
