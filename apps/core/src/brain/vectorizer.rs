//! TF-IDF text vectorizer.
//!
//! Turns a message into a sparse, L2-normalised TF-IDF vector over a fixed
//! vocabulary. The vocabulary and IDF weights come from a pre-built artifact
//! (`vectorizer.json`); nothing is learned at runtime.

use crate::error::AppError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

/// File name of the vectorizer artifact inside a model directory
pub const VECTORIZER_FILE: &str = "vectorizer.json";

/// Stopwords dropped before vectorizing
const STOPWORDS_EN: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "nor", "for", "yet", "so", "i", "you", "he", "she", "it",
    "we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
    "mine", "yours", "hers", "ours", "theirs", "this", "that", "these", "those", "who", "whom",
    "which", "what", "whose", "is", "am", "are", "was", "were", "be", "been", "being", "have",
    "has", "had", "having", "do", "does", "did", "doing", "will", "would", "shall", "should",
    "can", "could", "may", "might", "must", "in", "on", "at", "to", "from", "by", "with", "about",
    "against", "between", "into", "through", "during", "before", "after", "above", "below", "up",
    "down", "out", "off", "over", "under", "again", "further", "here", "there", "where", "when",
    "why", "how", "all", "each", "every", "both", "few", "more", "most", "other", "some", "any",
    "only", "own", "same", "than", "too", "very", "just", "also", "now", "then", "once", "if",
    "because", "as", "until", "while", "although", "though", "im", "ive", "dont",
];

// NOTE: expect() is acceptable here: the patterns are compile-time constants.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://\S+|www\.\S+").expect("Invalid regex: URL pattern")
});
static PUNCTUATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("Invalid regex: punctuation pattern"));
static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS_EN.iter().copied().collect());

/// Sparse feature vector: (feature index, weight)
pub type SparseVector = Vec<(usize, f32)>;

/// Clean text for the vectorizer: lowercase, drop URLs and punctuation,
/// remove stopwords and tokens of two characters or fewer.
pub fn preprocess(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let without_urls = URL_PATTERN.replace_all(&lower, " ");
    let cleaned = PUNCTUATION_PATTERN.replace_all(&without_urls, "");
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Pre-built TF-IDF vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// term -> feature index
    vocabulary: HashMap<String, usize>,
    /// IDF weight per feature index
    idf: Vec<f32>,
    /// Use 1 + ln(tf) instead of raw counts
    #[serde(default)]
    sublinear_tf: bool,
}

impl TfidfVectorizer {
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f32>) -> Result<Self, AppError> {
        let vectorizer = Self {
            vocabulary,
            idf,
            sublinear_tf: false,
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    /// Load `vectorizer.json` from a model directory.
    pub fn load(model_dir: &Path) -> Result<Self, AppError> {
        let path = model_dir.join(VECTORIZER_FILE);
        let bytes = std::fs::read(&path)
            .map_err(|e| AppError::ModelLoad(format!("Cannot read {:?}: {}", path, e)))?;
        let vectorizer: Self = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::ModelLoad(format!("Corrupt vectorizer {:?}: {}", path, e)))?;
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.vocabulary.is_empty() {
            return Err(AppError::ModelLoad("Vectorizer vocabulary is empty".to_string()));
        }
        if let Some((term, idx)) = self.vocabulary.iter().find(|(_, idx)| **idx >= self.idf.len()) {
            return Err(AppError::ModelLoad(format!(
                "Vocabulary term '{}' maps to index {} but only {} IDF weights exist",
                term,
                idx,
                self.idf.len()
            )));
        }
        Ok(())
    }

    /// Number of features produced by `transform`
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Vectorize a text. Out-of-vocabulary terms are ignored; an all-OOV text
    /// yields an empty vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for token in preprocess(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut features: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (idx, tf * self.idf[idx])
            })
            .collect();

        let norm = features.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut features {
                *w /= norm;
            }
        }
        features.sort_by_key(|(idx, _)| *idx);
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer() -> TfidfVectorizer {
        let vocabulary = [("sad", 0), ("anxious", 1), ("sleep", 2)]
            .into_iter()
            .map(|(t, i)| (t.to_string(), i))
            .collect();
        TfidfVectorizer::new(vocabulary, vec![1.0, 2.0, 1.5]).unwrap()
    }

    #[test]
    fn test_preprocess_filters_noise() {
        let tokens = preprocess("I'm SO sad!! see https://example.com and www.test.org");
        assert_eq!(tokens, vec!["sad", "see"]);
    }

    #[test]
    fn test_stopword_filtering() {
        assert!(preprocess("the a an is are was were").is_empty());
    }

    #[test]
    fn test_transform_is_normalised() {
        let v = vectorizer();
        let features = v.transform("sad and anxious, so anxious");
        assert_eq!(features.len(), 2);
        let norm: f32 = features.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        // "anxious" appears twice and has the higher IDF
        assert!(features[1].1 > features[0].1);
    }

    #[test]
    fn test_out_of_vocabulary_text() {
        assert!(vectorizer().transform("completely unrelated words").is_empty());
    }

    #[test]
    fn test_rejects_vocabulary_beyond_idf() {
        let vocabulary = [("sad".to_string(), 3)].into_iter().collect();
        let err = TfidfVectorizer::new(vocabulary, vec![1.0]).unwrap_err();
        assert!(matches!(err, AppError::ModelLoad(_)));
    }
}
