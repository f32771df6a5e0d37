//! Preflight Check System
//!
//! Verifies the intent source, model artifacts and crisis configuration
//! before the engine starts. Intent and crisis problems block startup; a
//! missing or broken model only means the engine runs in fallback mode.

use crate::brain::crisis::CrisisDetector;
use crate::brain::intent::IntentIndex;
use crate::brain::predictor::{StatisticalIntentPredictor, CLASSIFIER_FILE};
use crate::brain::vectorizer::VECTORIZER_FILE;
use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Result of a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Complete preflight check report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightReport {
    pub all_passed: bool,
    pub checks: Vec<CheckResult>,
    pub ready_to_start: bool,
    /// The statistical model is unusable; keyword fallback will be used
    pub fallback_mode: bool,
    pub summary: String,
}

impl PreflightReport {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

fn is_critical_check(name: &str) -> bool {
    matches!(name, "engine_config" | "intent_source" | "crisis_config")
}

/// Runs all checks against `config` and returns a report
pub fn run_preflight_checks(config: &EngineConfig) -> PreflightReport {
    info!("Running preflight checks");

    let mut checks = vec![
        check_engine_config(config),
        check_intent_source(config),
        check_crisis_config(config),
    ];

    let artifacts = check_model_artifacts(config);
    let artifacts_present = artifacts.passed;
    checks.push(artifacts);
    if artifacts_present {
        checks.push(check_model_load(config));
    } else {
        checks.push(CheckResult::fail(
            "model_load",
            "Skipped - model artifacts missing",
            None,
        ));
    }

    let all_passed = checks.iter().all(|c| c.passed);
    let critical_passed = checks
        .iter()
        .filter(|c| is_critical_check(&c.name))
        .all(|c| c.passed);
    let fallback_mode = checks
        .iter()
        .filter(|c| !is_critical_check(&c.name))
        .any(|c| !c.passed);

    let summary = if all_passed {
        "All checks passed. Engine ready.".to_string()
    } else if critical_passed {
        "Statistical model unavailable. Engine will start in keyword fallback mode.".to_string()
    } else {
        "Critical checks failed. Engine cannot start.".to_string()
    };

    for check in &checks {
        if check.passed {
            info!("  [ok] {}: {}", check.name, check.message);
        } else {
            warn!("  [fail] {}: {}", check.name, check.message);
            if let Some(details) = &check.details {
                warn!("      Details: {}", details);
            }
        }
    }
    info!("Summary: {}", summary);

    PreflightReport {
        all_passed,
        checks,
        ready_to_start: critical_passed,
        fallback_mode,
        summary,
    }
}

// --- Individual Checks ---

fn check_engine_config(config: &EngineConfig) -> CheckResult {
    match config.check() {
        Ok(()) => CheckResult::pass("engine_config", "Configuration valid"),
        Err(e) => CheckResult::fail("engine_config", "Invalid configuration", Some(e.to_string())),
    }
}

fn check_intent_source(config: &EngineConfig) -> CheckResult {
    match IntentIndex::load(&config.intents_path) {
        Ok(index) => {
            let emergency = index.intents().iter().filter(|i| i.is_emergency()).count();
            CheckResult::pass(
                "intent_source",
                &format!("{} intents loaded ({} emergency)", index.len(), emergency),
            )
        }
        Err(e) => CheckResult::fail(
            "intent_source",
            "Intent definitions unusable",
            Some(format!("{:?}: {}", config.intents_path, e)),
        ),
    }
}

fn check_crisis_config(config: &EngineConfig) -> CheckResult {
    match CrisisDetector::new(&config.crisis) {
        Ok(_) => CheckResult::pass(
            "crisis_config",
            &format!(
                "Crisis tiers OK (immediate: {} phrases, concerning: {} phrases)",
                config.crisis.immediate.phrases.len(),
                config.crisis.concerning.phrases.len()
            ),
        ),
        Err(e) => CheckResult::fail("crisis_config", "Crisis detector cannot run", Some(e.to_string())),
    }
}

fn check_model_artifacts(config: &EngineConfig) -> CheckResult {
    if !config.model_dir.is_dir() {
        return CheckResult::fail(
            "model_artifacts",
            "Model directory not found",
            Some(format!("Expected at: {:?}", config.model_dir)),
        );
    }

    let missing: Vec<&str> = [VECTORIZER_FILE, CLASSIFIER_FILE]
        .into_iter()
        .filter(|file| !config.model_dir.join(file).is_file())
        .collect();
    if missing.is_empty() {
        CheckResult::pass("model_artifacts", "Vectorizer and classifier present")
    } else {
        CheckResult::fail(
            "model_artifacts",
            "Model artifacts incomplete",
            Some(format!("Missing: {}", missing.join(", "))),
        )
    }
}

fn check_model_load(config: &EngineConfig) -> CheckResult {
    match StatisticalIntentPredictor::load(&config.model_dir) {
        Ok(predictor) => CheckResult::pass(
            "model_load",
            &format!("Model loaded in {:?}", predictor.metrics().load_time),
        ),
        Err(e) => CheckResult::fail("model_load", "Model failed to load", Some(e.to_string())),
    }
}
