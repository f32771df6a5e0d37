use crate::actors::messages::{ActorError, AppError};
use crate::actors::session::{SessionHandle, SessionSettings};
use crate::actors::traits::{CrisisSafetyCheck, IntentPredictor, ResolverPredictor, SafetyCheck};
use crate::brain::context::{ConversationSummary, ConversationTurn, DialogueContext, DialoguePhase};
use crate::brain::crisis::{CrisisDetector, CrisisTier};
use crate::brain::generator::ResponseGenerator;
use crate::brain::intent::{ClassificationResult, IntentIndex};
use crate::brain::library::ResourceCategory;
use crate::brain::predictor::StatisticalIntentPredictor;
use crate::brain::resolver::{IntentResolver, ResolvedIntent};
use crate::brain::selector::ResponseSelector;
use crate::config::EngineConfig;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Reply while the engine components are still loading.
pub const INITIALIZING_REPLY: &str = "System initializing... please wait";

/// Reply when initialization failed.
pub const UNAVAILABLE_REPLY: &str =
    "The assistant is unavailable right now. If you are in crisis, call or text 988.";

/// Reply when a downstream stage failed.
pub const APOLOGY_REPLY: &str = "I'm having trouble responding. Please try again.";

const EMERGENCY_HEADLINE: &str = "[URGENT] Contact emergency services immediately.";

/// Fixed reply for the emergency short-circuit: headline plus every crisis resource.
pub fn emergency_reply() -> String {
    let mut reply = format!("{}\n\nImmediate help:", EMERGENCY_HEADLINE);
    for entry in ResourceCategory::Crisis.entries() {
        reply.push_str("\n• ");
        reply.push_str(&entry.to_string());
    }
    reply
}

/// Loaded engine components shared by every session
pub struct Engine {
    index: Arc<IntentIndex>,
    predictor: Arc<StatisticalIntentPredictor>,
    safety: Arc<dyn SafetyCheck>,
    intents: Arc<dyn IntentPredictor>,
    generator: Arc<ResponseGenerator>,
}

impl Engine {
    /// Wire loaded components together with the production async checks.
    pub fn assemble(
        config: &EngineConfig,
        index: Arc<IntentIndex>,
        predictor: Arc<StatisticalIntentPredictor>,
        crisis: Arc<CrisisDetector>,
        selector: ResponseSelector,
    ) -> Self {
        let resolver = IntentResolver::standard(
            Arc::clone(&index),
            Arc::clone(&predictor),
            config.pattern_confidence_threshold,
        );
        Self {
            index,
            predictor,
            safety: Arc::new(CrisisSafetyCheck::new(Arc::clone(&crisis))),
            intents: Arc::new(ResolverPredictor::new(Arc::new(resolver))),
            generator: Arc::new(ResponseGenerator::new(crisis, selector)),
        }
    }

    pub fn with_safety_check(mut self, safety: Arc<dyn SafetyCheck>) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_intent_predictor(mut self, intents: Arc<dyn IntentPredictor>) -> Self {
        self.intents = intents;
        self
    }
}

enum EngineState {
    Initializing,
    Ready(Arc<Engine>),
    Unavailable(String),
}

/// Externally visible engine state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Readiness {
    Initializing,
    Ready,
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub readiness: Readiness,
    pub intents_loaded: usize,
    pub model_loaded: bool,
    pub model_healthy: bool,
    pub fallback_active: bool,
    pub active_sessions: usize,
}

/// Façade over the engine: readiness, per-session actors and the boundary operations.
///
/// Every user-facing reply goes through `generate_response`, which never fails:
/// anything that goes wrong below it becomes a fixed reply.
pub struct ChatOrchestrator {
    config: EngineConfig,
    settings: SessionSettings,
    state: RwLock<EngineState>,
    sessions: Mutex<LruCache<String, SessionHandle>>,
}

impl ChatOrchestrator {
    /// An orchestrator in the `Initializing` state; call `initialize` to load components.
    pub fn new(config: EngineConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            settings: SessionSettings::from(&config),
            config,
            state: RwLock::new(EngineState::Initializing),
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// An orchestrator that is immediately ready with the given engine.
    pub fn with_engine(config: EngineConfig, engine: Engine) -> Self {
        let orchestrator = Self::new(config);
        orchestrator.set_state(EngineState::Ready(Arc::new(engine)));
        orchestrator
    }

    /// Create the orchestrator and load its components in the background.
    pub fn start(config: EngineConfig) -> Arc<Self> {
        let orchestrator = Arc::new(Self::new(config));
        let background = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if let Err(e) = background.initialize().await {
                error!("Engine initialization failed: {}", e);
            }
        });
        orchestrator
    }

    /// Load the crisis detector, intent stack and response selector on three
    /// blocking workers. All three must succeed for the engine to become ready.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), AppError> {
        info!("Initializing engine components");
        if let Err(e) = self.config.check() {
            error!("Engine unavailable: {}", e);
            self.set_state(EngineState::Unavailable(e.to_string()));
            return Err(e);
        }
        let crisis_config = self.config.crisis.clone();
        let intents_path = self.config.intents_path.clone();
        let model_dir = self.config.model_dir.clone();
        let threshold = self.config.pattern_confidence_threshold;
        let selector_config = self.config.selector();

        let safety_worker = tokio::task::spawn_blocking(move || {
            CrisisDetector::new(&crisis_config).map(Arc::new)
        });
        let intent_worker = tokio::task::spawn_blocking(move || -> Result<_, AppError> {
            let index = IntentIndex::load(&intents_path)?.with_threshold(threshold);
            let predictor = StatisticalIntentPredictor::load_or_fallback(&model_dir);
            Ok((Arc::new(index), Arc::new(predictor)))
        });
        let selector_worker = tokio::task::spawn_blocking(move || {
            Ok::<_, AppError>(ResponseSelector::new(selector_config))
        });

        let loaded = tokio::try_join!(
            flatten(safety_worker),
            flatten(intent_worker),
            flatten(selector_worker)
        );

        match loaded {
            Ok((crisis, (index, predictor), selector)) => {
                let engine = Engine::assemble(&self.config, index, predictor, crisis, selector);
                self.set_state(EngineState::Ready(Arc::new(engine)));
                info!("Engine ready");
                Ok(())
            }
            Err(e) => {
                error!("Engine unavailable: {}", e);
                self.set_state(EngineState::Unavailable(e.to_string()));
                Err(e)
            }
        }
    }

    fn set_state(&self, state: EngineState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn readiness(&self) -> Readiness {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            EngineState::Initializing => Readiness::Initializing,
            EngineState::Ready(_) => Readiness::Ready,
            EngineState::Unavailable(reason) => Readiness::Unavailable {
                reason: reason.clone(),
            },
        }
    }

    fn engine(&self) -> Result<Arc<Engine>, AppError> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            EngineState::Ready(engine) => Ok(Arc::clone(engine)),
            EngineState::Initializing => {
                Err(AppError::Internal("Engine not ready: initializing".to_string()))
            }
            EngineState::Unavailable(reason) => {
                Err(AppError::Internal(format!("Engine not ready: {}", reason)))
            }
        }
    }

    fn session(&self, session_id: &str, engine: &Engine) -> SessionHandle {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = sessions.get(session_id) {
            return handle.clone();
        }
        let handle = SessionHandle::spawn(session_id, Arc::clone(&engine.generator), &self.settings);
        if let Some((evicted, _)) = sessions.push(session_id.to_string(), handle.clone()) {
            debug!("Evicted session {}", evicted);
        }
        handle
    }

    fn existing_session(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    /// Reply to `message` from `user_id`, letting the engine resolve the intent.
    pub async fn get_response(&self, message: &str, user_id: &str) -> String {
        self.generate_response(user_id, message, None).await
    }

    /// Full pipeline for one message. Never fails; see the `*_REPLY` constants.
    #[instrument(skip(self, text))]
    pub async fn generate_response(&self, session_id: &str, text: &str, intent: Option<&str>) -> String {
        let engine = match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            EngineState::Initializing => return INITIALIZING_REPLY.to_string(),
            EngineState::Unavailable(_) => return UNAVAILABLE_REPLY.to_string(),
            EngineState::Ready(engine) => Arc::clone(engine),
        };

        match self.respond(&engine, session_id, text, intent).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Response error for session {}: {}", session_id, e);
                if matches!(e, AppError::Actor(ActorError::SessionClosed(_))) {
                    self.end_session(session_id);
                }
                APOLOGY_REPLY.to_string()
            }
        }
    }

    async fn respond(
        &self,
        engine: &Engine,
        session_id: &str,
        text: &str,
        intent: Option<&str>,
    ) -> Result<String, AppError> {
        let predicted = async {
            match intent {
                Some(tag) => Ok(Some(tag.to_string())),
                None => engine
                    .intents
                    .predict(text.to_string())
                    .await
                    .map(|resolved| resolved.map(|r| r.tag)),
            }
        };
        let (crisis, predicted) = tokio::join!(engine.safety.assess(text.to_string()), predicted);

        let crisis = crisis?;
        let intent = predicted.unwrap_or_else(|e| {
            warn!("Intent prediction failed, continuing without intent: {}", e);
            None
        });

        let session = self.session(session_id, engine);
        let emergency_intent = intent.as_deref().filter(|tag| engine.index.is_emergency_tag(tag));
        if crisis == Some(CrisisTier::Immediate) || emergency_intent.is_some() {
            if let Some(tag) = emergency_intent {
                if let Some(protocol) = engine.index.emergency_protocol(tag) {
                    warn!(intent = tag, protocol = %protocol, "Emergency protocol triggered");
                }
            }
            let reply = emergency_reply();
            if let Err(e) = session.record_emergency(text.to_string(), reply.clone()).await {
                error!("Failed to record emergency turn for {}: {}", session_id, e);
            }
            return Ok(reply);
        }

        session.generate(text.to_string(), crisis, intent).await
    }

    /// Pattern-path classification.
    pub fn classify_intent(&self, text: &str) -> Result<ClassificationResult, AppError> {
        Ok(self.engine()?.index.classify(text))
    }

    /// Statistical-path prediction, with the keyword fallback.
    pub async fn predict_intent(&self, text: &str) -> Result<Option<String>, AppError> {
        let predictor = Arc::clone(&self.engine()?.predictor);
        let text = text.to_string();
        Ok(tokio::task::spawn_blocking(move || predictor.predict(&text)).await?)
    }

    /// Ranked resolution: pattern, then statistical, then keyword.
    pub async fn resolve_intent(&self, text: &str) -> Result<Option<ResolvedIntent>, AppError> {
        let engine = self.engine()?;
        engine.intents.predict(text.to_string()).await
    }

    /// True only for the immediate crisis tier.
    pub async fn is_emergency(&self, text: &str) -> Result<bool, AppError> {
        let engine = self.engine()?;
        let tier = engine.safety.assess(text.to_string()).await?;
        Ok(tier == Some(CrisisTier::Immediate))
    }

    /// Session report; an unknown session reports as a fresh one.
    pub async fn conversation_summary(&self, session_id: &str) -> Result<ConversationSummary, AppError> {
        match self.existing_session(session_id) {
            Some(session) => session.summary().await,
            None => Ok(DialogueContext::new(
                self.settings.context_window,
                self.settings.crisis_reset_after,
            )
            .summary()),
        }
    }

    /// The last few turns of a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>, AppError> {
        match self.existing_session(session_id) {
            Some(session) => session.history().await,
            None => Ok(Vec::new()),
        }
    }

    /// Take a session out of CRISIS. Returns the resulting phase, or `None`
    /// for an unknown session.
    pub async fn reset_session(&self, session_id: &str) -> Result<Option<DialoguePhase>, AppError> {
        match self.existing_session(session_id) {
            Some(session) => {
                let phase = session.reset_crisis().await?;
                info!("Session {} reset to {}", session_id, phase);
                Ok(Some(phase))
            }
            None => Ok(None),
        }
    }

    /// Drop a session and its context. Returns whether it existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(session_id)
            .is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Re-read the intent source. On failure the previous set stays active
    /// and `Ok(false)` is returned.
    pub async fn reload_intents(&self) -> Result<bool, AppError> {
        let index = Arc::clone(&self.engine()?.index);
        Ok(tokio::task::spawn_blocking(move || index.reload()).await?)
    }

    pub async fn health(&self) -> EngineHealth {
        let readiness = self.readiness();
        let active_sessions = self.active_sessions();
        let Ok(engine) = self.engine() else {
            return EngineHealth {
                readiness,
                intents_loaded: 0,
                model_loaded: false,
                model_healthy: false,
                fallback_active: false,
                active_sessions,
            };
        };

        let predictor = Arc::clone(&engine.predictor);
        let model_healthy = tokio::task::spawn_blocking(move || predictor.health_check())
            .await
            .unwrap_or(false);
        let metrics = engine.predictor.metrics();
        EngineHealth {
            readiness,
            intents_loaded: engine.index.len(),
            model_loaded: metrics.model_loaded,
            model_healthy,
            fallback_active: metrics.fallback_active,
            active_sessions,
        }
    }
}

async fn flatten<T>(handle: JoinHandle<Result<T, AppError>>) -> Result<T, AppError> {
    handle.await?
}
