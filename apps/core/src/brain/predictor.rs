//! Statistical intent prediction with a keyword fallback.
//!
//! Wraps a pre-built TF-IDF vectorizer + linear classifier pair loaded from a
//! model directory. When the artifacts are missing, fail their self-test, or a
//! prediction errors, the predictor degrades to a static keyword table. It
//! never returns an error to its caller.

use crate::brain::vectorizer::{SparseVector, TfidfVectorizer};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// File name of the classifier artifact inside a model directory
pub const CLASSIFIER_FILE: &str = "intent_classifier.json";

/// Canary text run at load time and by `health_check`
const CANARY_TEXT: &str = "hello world";

/// Warm-up samples run once after a successful load
const WARM_UP_SAMPLES: &[&str] = &["hello", "I feel sad", "I'm anxious", "help"];

/// Keyword table used when the model is unavailable. First matching entry wins,
/// so the safety entry comes first.
const FALLBACK_KEYWORDS: &[(&str, &[&str])] = &[
    ("suicide_risk", &["suicide", "suicidal", "kill myself", "end it all"]),
    ("greeting", &["hello", "hi", "hey"]),
    ("depression", &["depressed", "sad", "hopeless"]),
    ("anxiety", &["anxious", "worry", "worried", "panic"]),
];

/// Anything that can map a text to an intent label.
pub trait IntentModel: Send + Sync {
    fn predict(&self, text: &str) -> Result<String, AppError>;
}

/// One-vs-rest linear classifier over TF-IDF features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    labels: Vec<String>,
    /// One weight row per label, one column per feature
    coefficients: Vec<Vec<f32>>,
    intercepts: Vec<f32>,
}

impl LinearClassifier {
    pub fn new(
        labels: Vec<String>,
        coefficients: Vec<Vec<f32>>,
        intercepts: Vec<f32>,
    ) -> Result<Self, AppError> {
        let classifier = Self {
            labels,
            coefficients,
            intercepts,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    /// Load `intent_classifier.json` from a model directory.
    pub fn load(model_dir: &Path) -> Result<Self, AppError> {
        let path = model_dir.join(CLASSIFIER_FILE);
        let bytes = std::fs::read(&path)
            .map_err(|e| AppError::ModelLoad(format!("Cannot read {:?}: {}", path, e)))?;
        let classifier: Self = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::ModelLoad(format!("Corrupt classifier {:?}: {}", path, e)))?;
        classifier.validate()?;
        Ok(classifier)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.labels.is_empty() {
            return Err(AppError::ModelLoad("Classifier has no labels".to_string()));
        }
        if self.coefficients.len() != self.labels.len() || self.intercepts.len() != self.labels.len() {
            return Err(AppError::ModelLoad(format!(
                "Classifier shape mismatch: {} labels, {} weight rows, {} intercepts",
                self.labels.len(),
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        Ok(())
    }

    pub fn predict(&self, features: &SparseVector) -> Result<&str, AppError> {
        let mut best: Option<(usize, f32)> = None;
        for (label, (row, intercept)) in self.coefficients.iter().zip(&self.intercepts).enumerate() {
            let mut score = *intercept;
            for &(idx, weight) in features {
                let coef = row.get(idx).ok_or_else(|| {
                    AppError::Prediction(format!(
                        "Feature {} outside classifier width {}",
                        idx,
                        row.len()
                    ))
                })?;
                score += coef * weight;
            }
            if !score.is_finite() {
                return Err(AppError::Prediction(format!(
                    "Non-finite score for label '{}'",
                    self.labels[label]
                )));
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((label, score));
            }
        }

        best.map(|(label, _)| self.labels[label].as_str())
            .ok_or_else(|| AppError::Prediction("Classifier produced no scores".to_string()))
    }
}

/// Vectorizer + classifier pair loaded from disk
#[derive(Debug, Clone)]
pub struct LinearIntentModel {
    vectorizer: TfidfVectorizer,
    classifier: LinearClassifier,
}

impl LinearIntentModel {
    pub fn new(vectorizer: TfidfVectorizer, classifier: LinearClassifier) -> Self {
        Self {
            vectorizer,
            classifier,
        }
    }

    pub fn load(model_dir: &Path) -> Result<Self, AppError> {
        if !model_dir.is_dir() {
            return Err(AppError::ModelLoad(format!(
                "Model directory not found: {:?}",
                model_dir
            )));
        }
        Ok(Self::new(
            TfidfVectorizer::load(model_dir)?,
            LinearClassifier::load(model_dir)?,
        ))
    }
}

impl IntentModel for LinearIntentModel {
    fn predict(&self, text: &str) -> Result<String, AppError> {
        let features = self.vectorizer.transform(text);
        self.classifier.predict(&features).map(str::to_string)
    }
}

/// Load and prediction statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct PredictorMetrics {
    pub load_time: Duration,
    pub last_predict_time: Duration,
    pub last_prediction: Option<String>,
    pub model_loaded: bool,
    pub fallback_active: bool,
}

/// Statistical intent predictor
pub struct StatisticalIntentPredictor {
    model: Option<Box<dyn IntentModel>>,
    metrics: Mutex<PredictorMetrics>,
}

impl std::fmt::Debug for StatisticalIntentPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticalIntentPredictor")
            .field("model_loaded", &self.model.is_some())
            .finish()
    }
}

impl StatisticalIntentPredictor {
    /// Load the vectorizer and classifier artifacts from `model_dir`.
    ///
    /// Fails with `ModelLoad` if either file is missing or corrupt, or if the
    /// canary prediction fails.
    pub fn load(model_dir: &Path) -> Result<Self, AppError> {
        info!("Loading intent model from {:?}", model_dir);
        let start = Instant::now();
        let model = LinearIntentModel::load(model_dir)?;
        let predictor = Self::with_model(Box::new(model))?;
        predictor.lock_metrics().load_time = start.elapsed();
        info!("Intent model loaded in {:?}", start.elapsed());
        Ok(predictor)
    }

    /// Load the model, or enter fallback-only mode if that fails.
    pub fn load_or_fallback(model_dir: &Path) -> Self {
        match Self::load(model_dir) {
            Ok(predictor) => predictor,
            Err(e) => {
                error!("Model loading failed: {}", e);
                warn!("Falling back to keyword matching only");
                Self::fallback_only()
            }
        }
    }

    /// A predictor with no model; every prediction uses the keyword table.
    pub fn fallback_only() -> Self {
        Self {
            model: None,
            metrics: Mutex::new(PredictorMetrics {
                fallback_active: true,
                ..PredictorMetrics::default()
            }),
        }
    }

    /// Wrap an already-built model after running the canary self-test and warm-up.
    pub fn with_model(model: Box<dyn IntentModel>) -> Result<Self, AppError> {
        model
            .predict(CANARY_TEXT)
            .map_err(|e| AppError::ModelLoad(format!("Model validation failed: {}", e)))?;

        let predictor = Self {
            model: Some(model),
            metrics: Mutex::new(PredictorMetrics {
                model_loaded: true,
                ..PredictorMetrics::default()
            }),
        };
        for sample in WARM_UP_SAMPLES {
            predictor.predict(sample);
        }
        Ok(predictor)
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, PredictorMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_fallback(&self) -> bool {
        self.model.is_none()
    }

    /// Predict an intent label for `text`.
    ///
    /// Texts shorter than two characters yield `None`. Model errors degrade to
    /// the keyword fallback.
    pub fn predict(&self, text: &str) -> Option<String> {
        let start = Instant::now();
        let processed = text.trim().to_lowercase();
        if processed.chars().count() < 2 {
            debug!("Empty or too-short input text");
            return None;
        }

        let prediction = match &self.model {
            Some(model) => match model.predict(&processed) {
                Ok(label) => Some(label),
                Err(e) => {
                    error!("Prediction failed: {}, falling back to keyword matching", e);
                    Self::fallback_predict(&processed)
                }
            },
            None => Self::fallback_predict(&processed),
        };

        let mut metrics = self.lock_metrics();
        metrics.last_predict_time = start.elapsed();
        metrics.last_prediction = prediction.clone();
        debug!("Predicted {:?} in {:?}", prediction, metrics.last_predict_time);
        prediction
    }

    /// Model-only prediction with no fallback. Errors when the model is not
    /// loaded or fails.
    pub fn try_predict(&self, text: &str) -> Result<Option<String>, AppError> {
        let processed = text.trim().to_lowercase();
        if processed.chars().count() < 2 {
            return Ok(None);
        }
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| AppError::ModelLoad("Intent model not loaded".to_string()))?;
        model.predict(&processed).map(Some)
    }

    /// Keyword-table prediction: first entry with a keyword present in the text.
    pub fn fallback_predict(text: &str) -> Option<String> {
        let padded = format!(" {} ", crate::brain::intent::tokenize(text).join(" "));
        FALLBACK_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| padded.contains(&format!(" {} ", kw))))
            .map(|(intent, _)| intent.to_string())
    }

    /// Re-run the canary prediction. Does not touch metrics.
    pub fn health_check(&self) -> bool {
        match &self.model {
            None => {
                warn!("Health check: primary model not loaded, using fallback");
                false
            }
            Some(model) => match model.predict(CANARY_TEXT) {
                Ok(_) => true,
                Err(e) => {
                    error!("Health check failed: {}", e);
                    false
                }
            },
        }
    }

    pub fn metrics(&self) -> PredictorMetrics {
        self.lock_metrics().clone()
    }
}
