//! Per-session response pipeline: record the message, check for crisis
//! language, then select a response.

use crate::brain::context::DialogueContext;
use crate::brain::crisis::{CrisisDetector, CrisisTier};
use crate::brain::selector::{ResponseKind, ResponseSelector, Selection};
use rand::Rng;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Reply to an empty or whitespace-only message
pub const EMPTY_INPUT_REPLY: &str = "Could you please share more about how you're feeling?";

#[derive(Debug, Clone)]
pub struct ResponseGenerator {
    crisis: Arc<CrisisDetector>,
    selector: ResponseSelector,
}

impl ResponseGenerator {
    pub fn new(crisis: Arc<CrisisDetector>, selector: ResponseSelector) -> Self {
        Self { crisis, selector }
    }

    pub fn crisis_detector(&self) -> &CrisisDetector {
        &self.crisis
    }

    /// Full pipeline for one message; runs the crisis scan itself.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        ctx: &mut DialogueContext,
        text: &str,
        intent: Option<&str>,
        rng: &mut R,
    ) -> String {
        let crisis = self.crisis.assess(text);
        self.compose(ctx, text, crisis, intent, rng).text
    }

    /// Pipeline with a crisis assessment computed by the caller.
    ///
    /// Empty input gets a prompt to share more and leaves the context untouched.
    #[instrument(skip_all, fields(crisis = ?crisis, intent = ?intent))]
    pub fn compose<R: Rng + ?Sized>(
        &self,
        ctx: &mut DialogueContext,
        text: &str,
        crisis: Option<CrisisTier>,
        intent: Option<&str>,
        rng: &mut R,
    ) -> Selection {
        if text.trim().is_empty() {
            return Selection {
                text: EMPTY_INPUT_REPLY.to_string(),
                intent: "general".to_string(),
                kind: ResponseKind::General,
            };
        }

        ctx.update(text);
        match crisis {
            Some(tier) => {
                warn!(tier = %tier, "Crisis response issued");
                ctx.enter_crisis();
            }
            None => ctx.note_crisis_free_turn(),
        }
        self.selector.respond(ctx, crisis, intent, text, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::context::DialoguePhase;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator() -> ResponseGenerator {
        ResponseGenerator::new(Arc::new(CrisisDetector::default()), ResponseSelector::default())
    }

    #[test]
    fn test_empty_input_guard() {
        let gen = generator();
        let mut ctx = DialogueContext::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(gen.generate(&mut ctx, "   ", None, &mut rng), EMPTY_INPUT_REPLY);
        assert_eq!(ctx.messages().count(), 0);
        assert_eq!(ctx.phase(), DialoguePhase::Initial);
    }

    #[test]
    fn test_crisis_enters_crisis_phase_regardless_of_intent() {
        let gen = generator();
        let mut ctx = DialogueContext::default();
        let mut rng = StdRng::seed_from_u64(0);
        gen.generate(&mut ctx, "hello", Some("greeting"), &mut rng);
        let reply = gen.generate(&mut ctx, "I want to kill myself", Some("greeting"), &mut rng);
        assert!(reply.contains("988"));
        assert_eq!(ctx.phase(), DialoguePhase::Crisis);
        assert!(ctx.summary().crisis_flagged);
    }

    #[test]
    fn test_crisis_phase_responses_carry_resources() {
        let gen = generator();
        let mut ctx = DialogueContext::default();
        let mut rng = StdRng::seed_from_u64(8);
        gen.generate(&mut ctx, "I want to die", None, &mut rng);
        let calm = gen.generate(&mut ctx, "ok I'm talking to someone", None, &mut rng);
        assert_eq!(ctx.phase(), DialoguePhase::Crisis);
        assert!(calm.contains("Helpful resources:"));
    }

    #[test]
    fn test_compose_uses_supplied_assessment() {
        let gen = generator();
        let mut ctx = DialogueContext::default();
        let mut rng = StdRng::seed_from_u64(0);
        let selection = gen.compose(&mut ctx, "whatever", Some(CrisisTier::Concerning), None, &mut rng);
        assert_eq!(selection.kind, ResponseKind::CrisisConcerning);
        assert_eq!(ctx.phase(), DialoguePhase::Crisis);
    }
}
