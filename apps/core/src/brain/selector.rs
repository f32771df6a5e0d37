//! Response selection.
//!
//! Picks a template for a resolved intent based on the dialogue phase,
//! personalises it and attaches resources. All randomness comes from the
//! caller's RNG so a seeded generator gives reproducible output.

use crate::brain::context::{DialogueContext, DialoguePhase};
use crate::brain::crisis::CrisisTier;
use crate::brain::intent::tokenize;
use crate::brain::library::{self, ResourceCategory, ResourceEntry, TemplateSet};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Used only if every candidate pool is empty
const LAST_RESORT_REPLY: &str = "I'm here to listen. Could you tell me more?";

/// Maximum resources appended to a non-crisis response
const MAX_RESOURCES: usize = 2;

/// Topic keyword buckets used when no intent is supplied. Checked in order.
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("self_harm", &["cutting", "self harm", "hurt myself", "harming myself"]),
    ("depression", &["depressed", "depression", "depressing", "hopeless", "worthless", "empty"]),
    ("anxiety", &["anxious", "anxiety", "panic", "overwhelmed", "nervous"]),
    ("trauma", &["trauma", "traumatic", "abuse", "abused", "ptsd", "flashback", "flashbacks"]),
    ("greeting", &["hello", "hi", "hey", "start"]),
];

// NOTE: expect() is acceptable here: the pattern is a compile-time constant.
static SECOND_PERSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\byou\b").expect("Invalid regex: second person pattern"));

/// Probabilities steering response selection
#[derive(Debug, Clone, Copy)]
pub struct SelectorConfig {
    pub actionable_probability: f64,
    pub validation_probability: f64,
    pub resource_probability: f64,
    pub positive_trend_threshold: f32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            actionable_probability: 0.7,
            validation_probability: 0.4,
            resource_probability: 0.6,
            positive_trend_threshold: 0.3,
        }
    }
}

/// Which pool a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    CrisisImmediate,
    CrisisConcerning,
    Actionable,
    Initial,
    FollowUp(&'static str),
    Validation,
    General,
}

/// A selected response with its provenance
#[derive(Debug, Clone)]
pub struct Selection {
    pub text: String,
    pub intent: String,
    pub kind: ResponseKind,
}

#[derive(Debug, Clone, Default)]
pub struct ResponseSelector {
    config: SelectorConfig,
}

impl ResponseSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Choose a response for `text`.
    ///
    /// A crisis tier bypasses everything else. Otherwise the supplied intent
    /// (or one derived from the text) picks a template according to the
    /// session phase, which may advance the phase.
    pub fn respond<R: Rng + ?Sized>(
        &self,
        ctx: &mut DialogueContext,
        crisis: Option<CrisisTier>,
        intent: Option<&str>,
        text: &str,
        rng: &mut R,
    ) -> Selection {
        if let Some(tier) = crisis {
            return Self::crisis_response(tier, rng);
        }

        let intent = match intent.map(str::trim).filter(|i| !i.is_empty()) {
            Some(tag) => tag.to_string(),
            None => self.determine_intent(ctx, text),
        };
        let set = library::templates(&intent);

        // Any reply to a new topic leaves INITIAL, actionable ones included
        let phase = ctx.phase();
        ctx.begin_topic(&intent);

        let (template, kind) = if !set.actionable.is_empty()
            && rng.gen_bool(self.config.actionable_probability)
        {
            (pick(set.actionable, rng), ResponseKind::Actionable)
        } else {
            match phase {
                DialoguePhase::Initial => (pick(set.initial, rng), ResponseKind::Initial),
                DialoguePhase::FollowUp => self.follow_up(ctx, set, rng),
                DialoguePhase::Resolution | DialoguePhase::Crisis => {
                    (pick(&set.general_pool(), rng), ResponseKind::General)
                }
            }
        };
        let template = template
            .or_else(|| pick(library::templates("general").initial, rng))
            .unwrap_or(LAST_RESORT_REPLY);

        let mut response = match &ctx.facts().name {
            Some(name) => personalize(template, name),
            None => template.to_string(),
        };

        let category = ResourceCategory::for_intent(&intent);
        let always = matches!(intent.as_str(), "suicide_risk" | "self_harm")
            || ctx.phase() == DialoguePhase::Crisis;
        if always {
            let category = category.unwrap_or(ResourceCategory::Crisis);
            response.push_str(&format_resources(sample(category.entries(), rng)));
        } else if let Some(category) = category {
            if rng.gen_bool(self.config.resource_probability) {
                response.push_str(&format_resources(sample(category.entries(), rng)));
            }
        }

        debug!(intent = %intent, kind = ?kind, phase = %ctx.phase(), "Selected response");
        Selection {
            text: response,
            intent,
            kind,
        }
    }

    fn crisis_response<R: Rng + ?Sized>(tier: CrisisTier, rng: &mut R) -> Selection {
        let crisis_resources = ResourceCategory::Crisis.entries();
        match tier {
            CrisisTier::Immediate => {
                let opener = pick(library::templates("suicide_risk").initial, rng)
                    .unwrap_or("Please call or text 988 right now.");
                let resources: Vec<String> =
                    crisis_resources.iter().map(ToString::to_string).collect();
                Selection {
                    text: format!("{}\n\nImmediate help:\n{}", opener, resources.join("\n")),
                    intent: "suicide_risk".to_string(),
                    kind: ResponseKind::CrisisImmediate,
                }
            }
            CrisisTier::Concerning => {
                let set = library::templates("self_harm");
                let opener = pick(set.initial, rng).unwrap_or(LAST_RESORT_REPLY);
                let probe = pick(set.safety, rng).unwrap_or("Is there someone you can reach out to right now?");
                let hotlines: Vec<&ResourceEntry> = crisis_resources.iter().take(MAX_RESOURCES).collect();
                Selection {
                    text: format!("{}\n\n{}{}", opener, probe, format_resources(hotlines)),
                    intent: "self_harm".to_string(),
                    kind: ResponseKind::CrisisConcerning,
                }
            }
        }
    }

    fn follow_up<R: Rng + ?Sized>(
        &self,
        ctx: &mut DialogueContext,
        set: &TemplateSet,
        rng: &mut R,
    ) -> (Option<&'static str>, ResponseKind) {
        if !set.validation.is_empty() && rng.gen_bool(self.config.validation_probability) {
            ctx.resolve();
            return (pick(set.validation, rng), ResponseKind::Validation);
        }
        if let Some(category) = ctx.next_follow_up(set) {
            let questions = set.follow_up_questions(category).unwrap_or_default();
            return (pick(questions, rng), ResponseKind::FollowUp(category));
        }
        if !set.validation.is_empty() {
            ctx.resolve();
            return (pick(set.validation, rng), ResponseKind::Validation);
        }
        (pick(&set.general_pool(), rng), ResponseKind::General)
    }

    /// Keyword buckets, then the session's sentiment trend, then "general".
    pub fn determine_intent(&self, ctx: &DialogueContext, text: &str) -> String {
        let padded = format!(" {} ", tokenize(text).join(" "));
        let bucket = TOPIC_KEYWORDS.iter().find(|(_, keywords)| {
            keywords.iter().any(|kw| padded.contains(&format!(" {} ", kw)))
        });
        if let Some((intent, _)) = bucket {
            return intent.to_string();
        }

        match ctx.average_sentiment() {
            Some(avg) if avg > self.config.positive_trend_threshold => "positive".to_string(),
            _ => "general".to_string(),
        }
    }
}

fn pick<R: Rng + ?Sized>(pool: &[&'static str], rng: &mut R) -> Option<&'static str> {
    pool.choose(rng).copied()
}

fn sample<'a, R: Rng + ?Sized>(entries: &'a [ResourceEntry], rng: &mut R) -> Vec<&'a ResourceEntry> {
    entries.choose_multiple(rng, MAX_RESOURCES).collect()
}

fn format_resources(entries: Vec<&ResourceEntry>) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
    format!("\n\nHelpful resources:\n• {}", lines.join("\n• "))
}

/// Add the user's name after the first standalone "you" (not "you're", "you've").
pub fn personalize(template: &str, name: &str) -> String {
    let target = SECOND_PERSON
        .find_iter(template)
        .find(|m| !template[m.end()..].starts_with('\''));
    match target {
        Some(m) => format!("{}, {}{}", &template[..m.end()], name, &template[m.end()..]),
        None => template.to_string(),
    }
}
