//! Per-session dialogue state.
//!
//! Holds the current topic, the dialogue phase, extracted user facts, a short
//! window of recent messages and the sentiment series. Phase changes only
//! happen through the transition methods below:
//!
//! ```text
//! INITIAL --begin_topic--> FOLLOW_UP --resolve--> RESOLUTION
//!    any  --enter_crisis--> CRISIS --reset_crisis--> FOLLOW_UP | INITIAL
//! ```
//!
//! RESOLUTION has no way back: a new topic there keeps the phase, so its
//! replies come from the general pool.

use crate::brain::library::TemplateSet;
use crate::brain::sentiment::analyze_sentiment;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Default number of recent user messages kept in the window
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// Number of most recent sentiment scores kept for inspection
const SENTIMENT_HISTORY_LIMIT: usize = 256;

/// Running-average sentiment above which the session trends positive
pub const DEFAULT_POSITIVE_TREND: f32 = 0.3;

// NOTE: expect() is acceptable here: the patterns are compile-time constants.
static EXPLICIT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:my name is|i'm called|i am called|call me)\s+([A-Za-z]+)")
        .expect("Invalid regex: explicit name pattern")
});
static SELF_INTRODUCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:\bi am|\bi'm)\s+([A-Z][a-z]+)\b").expect("Invalid regex: introduction pattern")
});
static THERAPY_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:see|seeing|saw|talk to|talking to)\s+(?:a|my)\s+(?:therapist|counselor|counsellor|psychologist)")
        .expect("Invalid regex: therapy pattern")
});
static MEDICATION_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:taking|on)\s+(?:medication|meds|antidepressants|prozac|zoloft|lexapro)\b")
        .expect("Invalid regex: medication pattern")
});
static SUPPORT_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:my|supportive)\s+(?:friends?|family|partner|spouse|wife|husband|parents?|mom|dad|sister|brother)\b")
        .expect("Invalid regex: support pattern")
});

/// Capitalised words that follow "I'm" without being a name
const NOT_A_NAME: &[&str] = &[
    "Feeling", "Not", "So", "Just", "Really", "Very", "Sad", "Tired", "Fine", "Okay", "Ok", "Good",
    "Here", "Scared", "Anxious", "Depressed", "Worried", "Afraid", "Sorry", "Done", "Always",
    "Still", "Going", "Having", "Trying", "Lonely", "Better", "Worse", "Stressed",
];

/// Dialogue phase of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialoguePhase {
    Initial,
    FollowUp,
    Resolution,
    Crisis,
}

impl fmt::Display for DialoguePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DialoguePhase::Initial => "INITIAL",
            DialoguePhase::FollowUp => "FOLLOW_UP",
            DialoguePhase::Resolution => "RESOLUTION",
            DialoguePhase::Crisis => "CRISIS",
        };
        write!(f, "{}", label)
    }
}

/// Facts extracted from the user's messages. Each is set at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserFacts {
    pub name: Option<String>,
    pub therapy_history: Option<bool>,
    pub medication: Option<bool>,
    pub support_system: Option<bool>,
}

impl UserFacts {
    fn extract(&mut self, message: &str) {
        let message = message.replace('\u{2019}', "'");

        if self.name.is_none() {
            let explicit = EXPLICIT_NAME.captures(&message).map(|c| c[1].to_string());
            let introduced = || {
                SELF_INTRODUCTION
                    .captures(&message)
                    .map(|c| c[1].to_string())
                    .filter(|name| !NOT_A_NAME.contains(&name.as_str()))
            };
            if let Some(name) = explicit.or_else(introduced) {
                debug!("Captured user name");
                self.name = Some(name);
            }
        }
        if self.therapy_history.is_none() && THERAPY_MENTION.is_match(&message) {
            self.therapy_history = Some(true);
        }
        if self.medication.is_none() && MEDICATION_MENTION.is_match(&message) {
            self.medication = Some(true);
        }
        if self.support_system.is_none() && SUPPORT_MENTION.is_match(&message) {
            self.support_system = Some(true);
        }
    }

    /// Whether a follow-up category is already answered by a known fact
    fn covers(&self, category: &str) -> bool {
        match category {
            "support" => self.support_system.is_some(),
            _ => false,
        }
    }
}

/// One exchange in the bounded per-session history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub user: String,
    pub bot: String,
}

/// Overall direction of the session's sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTrend {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

/// Read-only session report
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub duration_minutes: i64,
    pub main_topics: Vec<String>,
    pub sentiment_trend: SentimentTrend,
    pub user_info: UserFacts,
    pub crisis_flagged: bool,
}

#[derive(Debug, Clone)]
pub struct DialogueContext {
    phase: DialoguePhase,
    current_topic: Option<String>,
    topics: Vec<String>,
    facts: UserFacts,
    messages: VecDeque<String>,
    window: usize,
    sentiment: VecDeque<f32>,
    sentiment_sum: f64,
    sentiment_count: u64,
    asked_follow_ups: Vec<&'static str>,
    crisis_flagged: bool,
    crisis_free_turns: u32,
    crisis_reset_after: Option<u32>,
    started_at: DateTime<Utc>,
}

impl Default for DialogueContext {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_WINDOW, None)
    }
}

impl DialogueContext {
    pub fn new(window: usize, crisis_reset_after: Option<u32>) -> Self {
        Self {
            phase: DialoguePhase::Initial,
            current_topic: None,
            topics: Vec::new(),
            facts: UserFacts::default(),
            messages: VecDeque::with_capacity(window),
            window: window.max(1),
            sentiment: VecDeque::new(),
            sentiment_sum: 0.0,
            sentiment_count: 0,
            asked_follow_ups: Vec::new(),
            crisis_flagged: false,
            crisis_free_turns: 0,
            crisis_reset_after,
            started_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> DialoguePhase {
        self.phase
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.current_topic.as_deref()
    }

    pub fn facts(&self) -> &UserFacts {
        &self.facts
    }

    /// Recent user messages, oldest first
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    /// Recent sentiment scores, oldest first
    pub fn sentiment_history(&self) -> impl Iterator<Item = f32> + '_ {
        self.sentiment.iter().copied()
    }

    pub fn crisis_flagged(&self) -> bool {
        self.crisis_flagged
    }

    /// Record an inbound message: window, sentiment series and fact extraction.
    /// Returns the message's sentiment score.
    pub fn update(&mut self, message: &str) -> f32 {
        if self.messages.len() == self.window {
            self.messages.pop_front();
        }
        self.messages.push_back(message.to_string());

        let score = analyze_sentiment(message);
        if self.sentiment.len() == SENTIMENT_HISTORY_LIMIT {
            self.sentiment.pop_front();
        }
        self.sentiment.push_back(score);
        self.sentiment_sum += f64::from(score);
        self.sentiment_count += 1;

        self.facts.extract(message);
        score
    }

    /// Mean of every sentiment score recorded this session
    pub fn average_sentiment(&self) -> Option<f32> {
        (self.sentiment_count > 0).then(|| (self.sentiment_sum / self.sentiment_count as f64) as f32)
    }

    pub fn sentiment_trend(&self) -> SentimentTrend {
        match self.average_sentiment() {
            None => SentimentTrend::Neutral,
            Some(avg) if avg > DEFAULT_POSITIVE_TREND => SentimentTrend::Positive,
            Some(avg) if avg < -DEFAULT_POSITIVE_TREND => SentimentTrend::Negative,
            Some(_) => SentimentTrend::Mixed,
        }
    }

    /// Record the topic of this turn. A new topic clears the asked follow-ups;
    /// from INITIAL this moves the session to FOLLOW_UP.
    pub fn begin_topic(&mut self, intent: &str) {
        if self.current_topic.as_deref() != Some(intent) {
            self.current_topic = Some(intent.to_string());
            self.asked_follow_ups.clear();
            if !self.topics.iter().any(|t| t == intent) {
                self.topics.push(intent.to_string());
            }
        }
        if self.phase == DialoguePhase::Initial {
            self.phase = DialoguePhase::FollowUp;
        }
    }

    /// Next follow-up category for the current topic that is neither asked nor
    /// already answered by a known fact. Marks it as asked.
    pub fn next_follow_up(&mut self, templates: &TemplateSet) -> Option<&'static str> {
        let category = templates
            .follow_up
            .iter()
            .map(|(name, _)| *name)
            .find(|name| !self.asked_follow_ups.contains(name) && !self.facts.covers(name))?;
        self.asked_follow_ups.push(category);
        Some(category)
    }

    /// FOLLOW_UP -> RESOLUTION. No effect in other phases.
    pub fn resolve(&mut self) {
        if self.phase == DialoguePhase::FollowUp {
            self.phase = DialoguePhase::Resolution;
        }
    }

    /// Unconditional move to CRISIS.
    pub fn enter_crisis(&mut self) {
        if self.phase != DialoguePhase::Crisis {
            info!("Session entering CRISIS phase");
        }
        self.phase = DialoguePhase::Crisis;
        self.crisis_flagged = true;
        self.crisis_free_turns = 0;
    }

    /// Count a turn without crisis language. With an automatic reset policy,
    /// enough consecutive calm turns leave CRISIS.
    pub fn note_crisis_free_turn(&mut self) {
        if self.phase != DialoguePhase::Crisis {
            return;
        }
        self.crisis_free_turns += 1;
        if let Some(limit) = self.crisis_reset_after {
            if self.crisis_free_turns >= limit {
                info!("Leaving CRISIS phase after {} crisis-free turns", self.crisis_free_turns);
                self.reset_crisis();
            }
        }
    }

    /// Leave CRISIS: FOLLOW_UP if a topic is known, otherwise INITIAL.
    /// `crisis_flagged` stays set for the rest of the session.
    pub fn reset_crisis(&mut self) {
        if self.phase != DialoguePhase::Crisis {
            return;
        }
        self.crisis_free_turns = 0;
        self.phase = if self.current_topic.is_some() {
            DialoguePhase::FollowUp
        } else {
            DialoguePhase::Initial
        };
    }

    pub fn summary(&self) -> ConversationSummary {
        self.summary_at(Utc::now())
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> ConversationSummary {
        ConversationSummary {
            duration_minutes: (now - self.started_at).num_minutes().max(0),
            main_topics: self.topics.clone(),
            sentiment_trend: self.sentiment_trend(),
            user_info: self.facts.clone(),
            crisis_flagged: self.crisis_flagged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::library::templates;
    use chrono::Duration;

    #[test]
    fn test_fresh_context() {
        let ctx = DialogueContext::default();
        assert_eq!(ctx.phase(), DialoguePhase::Initial);
        assert_eq!(ctx.current_topic(), None);
        assert_eq!(ctx.sentiment_trend(), SentimentTrend::Neutral);
        assert_eq!(ctx.average_sentiment(), None);
    }

    #[test]
    fn test_message_window_is_bounded() {
        let mut ctx = DialogueContext::new(3, None);
        for i in 0..5 {
            ctx.update(&format!("message {}", i));
        }
        let kept: Vec<&str> = ctx.messages().collect();
        assert_eq!(kept, vec!["message 2", "message 3", "message 4"]);
        assert_eq!(ctx.sentiment_history().count(), 5);
    }

    #[test]
    fn test_name_extraction_first_wins() {
        let mut ctx = DialogueContext::default();
        ctx.update("hi, my name is Sam");
        ctx.update("actually, call me Alex");
        assert_eq!(ctx.facts().name.as_deref(), Some("Sam"));
    }

    #[test]
    fn test_feelings_are_not_names() {
        let mut ctx = DialogueContext::default();
        ctx.update("I'm Feeling awful");
        ctx.update("i am sad");
        assert_eq!(ctx.facts().name, None);
        ctx.update("I'm Jordan");
        assert_eq!(ctx.facts().name.as_deref(), Some("Jordan"));
    }

    #[test]
    fn test_fact_flags() {
        let mut ctx = DialogueContext::default();
        ctx.update("I started seeing a therapist and I'm taking medication");
        ctx.update("my sister checks on me");
        let facts = ctx.facts();
        assert_eq!(facts.therapy_history, Some(true));
        assert_eq!(facts.medication, Some(true));
        assert_eq!(facts.support_system, Some(true));
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut ctx = DialogueContext::default();
        ctx.begin_topic("anxiety");
        assert_eq!(ctx.phase(), DialoguePhase::FollowUp);
        assert_eq!(ctx.current_topic(), Some("anxiety"));

        ctx.resolve();
        assert_eq!(ctx.phase(), DialoguePhase::Resolution);

        ctx.enter_crisis();
        assert_eq!(ctx.phase(), DialoguePhase::Crisis);
        // no automatic exit without a reset policy
        for _ in 0..10 {
            ctx.note_crisis_free_turn();
        }
        assert_eq!(ctx.phase(), DialoguePhase::Crisis);

        ctx.reset_crisis();
        assert_eq!(ctx.phase(), DialoguePhase::FollowUp);
        assert!(ctx.crisis_flagged());
    }

    #[test]
    fn test_crisis_reset_without_topic_goes_initial() {
        let mut ctx = DialogueContext::default();
        ctx.enter_crisis();
        ctx.reset_crisis();
        assert_eq!(ctx.phase(), DialoguePhase::Initial);
    }

    #[test]
    fn test_automatic_crisis_reset() {
        let mut ctx = DialogueContext::new(5, Some(2));
        ctx.begin_topic("depression");
        ctx.enter_crisis();
        ctx.note_crisis_free_turn();
        assert_eq!(ctx.phase(), DialoguePhase::Crisis);
        ctx.enter_crisis();
        ctx.note_crisis_free_turn();
        assert_eq!(ctx.phase(), DialoguePhase::Crisis, "a new crisis restarts the count");
        ctx.note_crisis_free_turn();
        assert_eq!(ctx.phase(), DialoguePhase::FollowUp);
    }

    #[test]
    fn test_follow_up_categories_in_order() {
        let mut ctx = DialogueContext::default();
        ctx.begin_topic("depression");
        let set = templates("depression");
        let asked: Vec<&str> = std::iter::from_fn(|| ctx.next_follow_up(set)).collect();
        assert_eq!(asked, vec!["duration", "triggers", "impact", "coping"]);
        assert_eq!(ctx.next_follow_up(set), None);

        ctx.begin_topic("anxiety");
        assert_eq!(ctx.next_follow_up(templates("anxiety")), Some("physical"));
    }

    #[test]
    fn test_known_support_skips_category() {
        let mut ctx = DialogueContext::default();
        ctx.update("my family knows everything");
        ctx.begin_topic("trauma");
        let set = templates("trauma");
        assert_eq!(ctx.next_follow_up(set), Some("safety"));
        assert_eq!(ctx.next_follow_up(set), Some("triggers"));
    }

    #[test]
    fn test_sentiment_trend() {
        let mut ctx = DialogueContext::default();
        for msg in ["I feel better", "this is awful", "there is hope", "I hate this", "some relief"] {
            ctx.update(msg);
        }
        assert_eq!(ctx.sentiment_trend(), SentimentTrend::Mixed);

        let mut up = DialogueContext::default();
        up.update("so much better");
        assert_eq!(up.sentiment_trend(), SentimentTrend::Positive);
    }

    #[test]
    fn test_summary() {
        let mut ctx = DialogueContext::default();
        ctx.update("my name is Robin");
        ctx.begin_topic("greeting");
        ctx.begin_topic("anxiety");
        ctx.begin_topic("greeting");
        let summary = ctx.summary_at(Utc::now() + Duration::minutes(12));
        assert_eq!(summary.main_topics, vec!["greeting", "anxiety"]);
        assert!(summary.duration_minutes >= 11);
        assert_eq!(summary.user_info.name.as_deref(), Some("Robin"));
        assert!(!summary.crisis_flagged);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sentiment_trend"], "neutral");
    }
}
