//! Per-session actor.
//!
//! Each session id gets one actor task that owns its `DialogueContext`, RNG
//! and turn history. Messages for a session are handled one at a time in
//! arrival order, so overlapping requests from the same user never race,
//! while different sessions run in parallel.

use crate::actors::messages::{ActorError, AppError, SessionMessage};
use crate::brain::context::{ConversationSummary, ConversationTurn, DialogueContext, DialoguePhase};
use crate::brain::crisis::CrisisTier;
use crate::brain::generator::ResponseGenerator;
use crate::config::EngineConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, instrument};

/// Per-session settings derived from the engine configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub context_window: usize,
    pub history_turns: usize,
    pub crisis_reset_after: Option<u32>,
    pub seed: Option<u64>,
    pub request_timeout: Duration,
}

impl From<&EngineConfig> for SessionSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            context_window: config.context_window,
            history_turns: config.history_turns,
            crisis_reset_after: config.crisis_reset_after,
            seed: config.seed,
            request_timeout: config.request_timeout(),
        }
    }
}

/// A handle to a `SessionActor`.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Arc<str>,
    sender: mpsc::Sender<SessionMessage>,
    request_timeout: Duration,
}

impl SessionHandle {
    /// Spawns the actor for `session_id` and returns a handle to it.
    ///
    /// The actor stops once every handle is dropped.
    pub fn spawn(session_id: &str, generator: Arc<ResponseGenerator>, settings: &SessionSettings) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let runner = SessionRunner::new(session_id, receiver, generator, settings);
        tokio::spawn(async move { runner.run().await });
        Self {
            session_id: Arc::from(session_id),
            sender,
            request_timeout: settings.request_timeout,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> Result<T, AppError> {
        let (send, recv) = oneshot::channel();
        self.sender.send(build(send)).await.map_err(|_| {
            AppError::Actor(ActorError::SessionClosed(self.session_id.to_string()))
        })?;
        timeout(self.request_timeout, recv)
            .await
            .map_err(ActorError::from)?
            .map_err(|_| {
                AppError::Actor(ActorError::Internal(format!(
                    "Session {} failed to respond",
                    self.session_id
                )))
            })
    }

    /// Generates a reply for `text` with checks computed by the caller.
    #[instrument(skip(self, text), fields(session = %self.session_id))]
    pub async fn generate(
        &self,
        text: String,
        crisis: Option<CrisisTier>,
        intent: Option<String>,
    ) -> Result<String, AppError> {
        self.request(|responder| SessionMessage::Generate {
            text,
            crisis,
            intent,
            responder,
        })
        .await?
    }

    /// Records a message answered by the emergency short-circuit.
    pub async fn record_emergency(&self, text: String, reply: String) -> Result<(), AppError> {
        self.request(|responder| SessionMessage::RecordEmergency {
            text,
            reply,
            responder,
        })
        .await
    }

    pub async fn summary(&self) -> Result<ConversationSummary, AppError> {
        self.request(|responder| SessionMessage::Summary { responder }).await
    }

    pub async fn history(&self) -> Result<Vec<ConversationTurn>, AppError> {
        self.request(|responder| SessionMessage::History { responder }).await
    }

    pub async fn reset_crisis(&self) -> Result<DialoguePhase, AppError> {
        self.request(|responder| SessionMessage::ResetCrisis { responder }).await
    }
}

// --- Actor Runner ---
struct SessionRunner {
    session_id: String,
    receiver: mpsc::Receiver<SessionMessage>,
    generator: Arc<ResponseGenerator>,
    context: DialogueContext,
    rng: StdRng,
    history: VecDeque<ConversationTurn>,
    history_turns: usize,
}

impl SessionRunner {
    fn new(
        session_id: &str,
        receiver: mpsc::Receiver<SessionMessage>,
        generator: Arc<ResponseGenerator>,
        settings: &SessionSettings,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            session_id: session_id.to_string(),
            receiver,
            generator,
            context: DialogueContext::new(settings.context_window, settings.crisis_reset_after),
            rng,
            history: VecDeque::with_capacity(settings.history_turns),
            history_turns: settings.history_turns.max(1),
        }
    }

    async fn run(mut self) {
        info!("Session {} started", self.session_id);
        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg);
        }
        info!("Session {} stopped", self.session_id);
    }

    fn handle_message(&mut self, msg: SessionMessage) {
        match msg {
            SessionMessage::Generate {
                text,
                crisis,
                intent,
                responder,
            } => {
                let selection = self.generator.compose(
                    &mut self.context,
                    &text,
                    crisis,
                    intent.as_deref(),
                    &mut self.rng,
                );
                debug!(session = %self.session_id, kind = ?selection.kind, phase = %self.context.phase(), "Reply composed");
                self.push_turn(text, selection.text.clone());
                let _ = responder.send(Ok(selection.text));
            }
            SessionMessage::RecordEmergency {
                text,
                reply,
                responder,
            } => {
                self.context.update(&text);
                self.context.enter_crisis();
                self.push_turn(text, reply);
                let _ = responder.send(());
            }
            SessionMessage::Summary { responder } => {
                let _ = responder.send(self.context.summary());
            }
            SessionMessage::History { responder } => {
                let _ = responder.send(self.history.iter().cloned().collect());
            }
            SessionMessage::ResetCrisis { responder } => {
                self.context.reset_crisis();
                let _ = responder.send(self.context.phase());
            }
        }
    }

    fn push_turn(&mut self, user: String, bot: String) {
        if user.trim().is_empty() {
            return;
        }
        if self.history.len() == self.history_turns {
            self.history.pop_front();
        }
        self.history.push_back(ConversationTurn { user, bot });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::crisis::CrisisDetector;
    use crate::brain::selector::ResponseSelector;

    fn settings() -> SessionSettings {
        SessionSettings {
            context_window: 5,
            history_turns: 4,
            crisis_reset_after: None,
            seed: Some(17),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn generator() -> Arc<ResponseGenerator> {
        Arc::new(ResponseGenerator::new(
            Arc::new(CrisisDetector::default()),
            ResponseSelector::default(),
        ))
    }

    #[tokio::test]
    async fn test_history_keeps_last_four_turns() {
        let session = SessionHandle::spawn("s1", generator(), &settings());
        for i in 0..6 {
            session.generate(format!("message {}", i), None, None).await.unwrap();
        }
        let history = session.history().await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].user, "message 2");
        assert_eq!(history[3].user, "message 5");
    }

    #[tokio::test]
    async fn test_emergency_record_marks_crisis() {
        let session = SessionHandle::spawn("s2", generator(), &settings());
        session
            .record_emergency("I want to die".to_string(), "[URGENT]".to_string())
            .await
            .unwrap();
        assert!(session.summary().await.unwrap().crisis_flagged);
        assert_eq!(session.reset_crisis().await.unwrap(), DialoguePhase::Initial);
        assert_eq!(session.history().await.unwrap()[0].bot, "[URGENT]");
    }

    #[tokio::test]
    async fn test_seeded_sessions_reply_identically() {
        let a = SessionHandle::spawn("a", generator(), &settings());
        let b = SessionHandle::spawn("b", generator(), &settings());
        for text in ["hello", "I feel anxious", "panic at night"] {
            let ra = a.generate(text.to_string(), None, None).await.unwrap();
            let rb = b.generate(text.to_string(), None, None).await.unwrap();
            assert_eq!(ra, rb);
        }
    }

    #[tokio::test]
    async fn test_empty_message_not_recorded() {
        let session = SessionHandle::spawn("s3", generator(), &settings());
        let reply = session.generate("  ".to_string(), None, None).await.unwrap();
        assert_eq!(reply, crate::brain::generator::EMPTY_INPUT_REPLY);
        assert!(session.history().await.unwrap().is_empty());
    }
}
