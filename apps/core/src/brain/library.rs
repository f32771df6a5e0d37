//! Static response templates and curated support resources.

use std::fmt;

/// Template pools for one intent
#[derive(Debug)]
pub struct TemplateSet {
    pub initial: &'static [&'static str],
    /// Follow-up questions by category, asked in this order
    pub follow_up: &'static [(&'static str, &'static [&'static str])],
    pub validation: &'static [&'static str],
    pub professional: &'static [&'static str],
    pub actionable: &'static [&'static str],
    pub grounding: &'static [&'static str],
    /// Safety probes used by the concerning crisis path
    pub safety: &'static [&'static str],
}

impl TemplateSet {
    const EMPTY: TemplateSet = TemplateSet {
        initial: &[],
        follow_up: &[],
        validation: &[],
        professional: &[],
        actionable: &[],
        grounding: &[],
        safety: &[],
    };

    /// Every template outside the follow-up questions
    pub fn general_pool(&self) -> Vec<&'static str> {
        [
            self.initial,
            self.validation,
            self.professional,
            self.actionable,
            self.grounding,
        ]
        .concat()
    }

    pub fn follow_up_questions(&self, category: &str) -> Option<&'static [&'static str]> {
        self.follow_up
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, questions)| *questions)
    }
}

static DEPRESSION: TemplateSet = TemplateSet {
    initial: &[
        "I hear the pain in your words. When feeling this way, try breaking tasks into tiny steps. Would you like to share more?",
        "Depression can feel overwhelming. Right now, focus on one small thing you can do today. Want to talk about it?",
        "You're not alone in this struggle. Many find it helpful to focus on just the next hour rather than the whole day.",
        "Thank you for sharing this with me. Depression can be isolating, but you're reaching out, and that takes strength.",
        "I want you to know that what you're feeling is valid, even if depression tells you otherwise.",
    ],
    follow_up: &[
        ("duration", &[
            "How long have you felt this way? Tracking small wins helps. Even getting up is an achievement.",
            "Has this been a persistent feeling or something that comes and goes? Understanding the pattern can help.",
        ]),
        ("triggers", &[
            "What makes these feelings stronger? Identifying triggers helps build coping strategies.",
            "Have you noticed any situations, times of day, or thoughts that intensify these feelings?",
        ]),
        ("impact", &[
            "How has this affected your daily life? Be gentle with yourself, basic tasks can feel hard.",
            "Have you noticed changes in your sleep, appetite, or energy levels with these feelings?",
        ]),
        ("coping", &[
            "When you've felt this before, what helped slightly? Building on small successes creates momentum.",
            "What small things have made these feelings slightly more manageable? A shower, fresh air, or certain music?",
        ]),
    ],
    validation: &[
        "This sounds incredibly hard. Remember depression lies: your worth isn't defined by current struggles.",
        "What you're experiencing is real and valid, even if depression makes you doubt that.",
        "You're carrying a heavy burden, but you don't have to carry it alone. That's why you reached out.",
    ],
    professional: &[
        "A therapist could help develop personalized tools. Want info about professional support?",
        "Depression often responds well to treatment. Open to exploring support options?",
    ],
    actionable: &[
        "Right now, write down one tiny thing you can do today, even drinking water or opening a window.",
        "Try the '5-minute rule': pick one small activity and commit to just 5 minutes of it.",
        "Step outside for just one minute. Fresh air can sometimes provide a slight shift in perspective.",
        "Practice self-compassion: place a hand on your heart and say 'This is hard, and I'm doing my best.'",
    ],
    grounding: &[],
    safety: &[],
};

static ANXIETY: TemplateSet = TemplateSet {
    initial: &[
        "Anxiety can feel like a false alarm. Try slow breaths: inhale 4 counts, hold 4, exhale 6. Want to talk about triggers?",
        "I hear your worry. Place both feet flat, notice how it feels. Want to explore what's coming up?",
        "Anxiety often makes us overestimate danger and underestimate our ability to cope. What's worrying you?",
        "Your mind is sending danger signals, but you're actually safe right now. Let's explore that together.",
    ],
    follow_up: &[
        ("physical", &[
            "Where do you feel anxiety in your body? Chest, stomach, shoulders? Bringing awareness can help.",
            "Have you noticed physical signs like a racing heart, trembling, or shortness of breath?",
        ]),
        ("triggers", &[
            "What situations trigger these feelings? Identifying them helps prepare calming strategies.",
            "Does your anxiety tend to focus on particular areas like health, work, or relationships?",
        ]),
        ("frequency", &[
            "How often does this happen? Daily grounding exercises can build resilience over time.",
            "Would you say these feelings come in waves or are they more constant throughout the day?",
        ]),
        ("coping", &[
            "What has helped in the past when you've felt this anxious? Even small strategies matter.",
            "What small things have helped calm your anxiety before? A walk, music, or calling someone?",
        ]),
    ],
    validation: &[
        "Managing anxiety is exhausting. You're showing strength by facing these feelings.",
        "You're not overreacting. Anxiety creates real distress, and you're taking steps to manage it.",
        "Anxiety lies to us about our capabilities. You're stronger than your anxiety tells you.",
    ],
    professional: &[
        "Anxiety is very treatable. Would you like information about finding professional support?",
    ],
    actionable: &[
        "Try 'box breathing': inhale 4, hold 4, exhale 4, pause 4. Repeat until calmer.",
        "When thoughts race, write them down. Seeing them on paper can reduce their intensity.",
        "Try progressive muscle relaxation: tense then release each muscle group from toes to head.",
        "Try 'worry postponement': schedule 15 minutes later to worry, then return to the present.",
    ],
    grounding: &[
        "Let's try grounding: name 3 things you see, 2 you can touch, 1 you hear. How does that feel?",
        "Try 'square breathing': inhale 4, hold 4, exhale 4, hold 4. Repeat several cycles.",
    ],
    safety: &[],
};

static TRAUMA: TemplateSet = TemplateSet {
    initial: &[
        "It sounds like you've been through something difficult. You're safe here to share at your own pace.",
        "What you've experienced matters. You can share as much or as little as feels right.",
        "Talking about trauma can bring up many emotions. We can pause anytime you need.",
    ],
    follow_up: &[
        ("safety", &[
            "Do you feel physically and emotionally safe right now? Your safety is most important.",
            "Before we continue, check in with yourself. Do you feel safe continuing?",
        ]),
        ("support", &[
            "Do you have supportive people who know about this? Connection helps healing.",
            "Is there someone you can reach out to after our conversation if needed?",
        ]),
        ("triggers", &[
            "Have you noticed things that trigger memories or strong reactions? Identifying them helps.",
            "Do certain dates, places, or sensations bring up strong reactions?",
        ]),
        ("coping", &[
            "What has helped you cope when difficult memories come up?",
            "What activities help you reconnect with the present when memories intrude?",
        ]),
    ],
    validation: &[],
    professional: &[
        "A trauma specialist could help process this safely. Want information about that?",
        "There are therapies specifically designed for trauma recovery. Interested to learn more?",
    ],
    actionable: &[
        "If emotions feel overwhelming, try orienting to the present: name objects around you.",
        "For trauma triggers, try the 'butterfly hug': cross your arms and alternately tap your shoulders.",
        "Create a 'safe space' in your mind you can visualize when feeling overwhelmed.",
    ],
    grounding: &[],
    safety: &[],
};

static SELF_HARM: TemplateSet = TemplateSet {
    initial: &[
        "I hear your pain. Let's focus on keeping you safe right now. You matter deeply.",
        "You're not alone in this. Let's find ways to get through this difficult moment together.",
        "I'm here with you in this difficult moment. Let's focus on your safety.",
        "You don't have to face this alone. Let's think about who could support you right now.",
    ],
    follow_up: &[],
    validation: &[],
    professional: &[
        "I strongly encourage connecting with a mental health professional about this.",
        "A mental health professional could help you build a personalized safety plan.",
    ],
    actionable: &[
        "If urges feel strong, try holding ice cubes. The sensation can help ground you.",
        "Write down what you're feeling in detail, then tear the paper into small pieces.",
        "Create a 'distraction box' with items that engage your senses.",
    ],
    grounding: &[],
    safety: &[
        "Is there someone you can reach out to right now? You deserve support.",
        "What's one small thing that might help you feel slightly safer right now?",
        "Is there a friend or family member who could stay with you right now?",
        "Have you made a safety plan before? Let's review or create one now.",
    ],
};

static SUICIDE_RISK: TemplateSet = TemplateSet {
    initial: &[
        "I'm deeply concerned for your safety. Please call 988 (Suicide Prevention Lifeline) right now.",
        "You're not alone. Text HOME to 741741 (Crisis Text Line) immediately for support.",
        "Your life matters tremendously. Please call emergency services or 988 right now.",
        "Help is available right now. Would you be willing to call 988 together?",
    ],
    follow_up: &[],
    validation: &[],
    professional: &[],
    actionable: &[],
    grounding: &[],
    safety: &[
        "Is there someone who can stay with you right now? You shouldn't be alone with these feelings.",
        "Would you be willing to call someone who can help right now? You don't have to do this alone.",
    ],
};

static GREETING: TemplateSet = TemplateSet {
    initial: &[
        "Hello, I'm here to listen without judgment. How are you feeling in this moment?",
        "Welcome. I'm here to support you. What's on your mind today?",
        "Hi there. I'm here to listen. What would you like to talk about today?",
        "Hello. This is a safe space for you to share what's on your heart and mind.",
    ],
    ..TemplateSet::EMPTY
};

static GENERAL: TemplateSet = TemplateSet {
    initial: &[
        "I want to understand what you're experiencing. Try taking a slow breath before sharing more.",
        "I hear you. Would you like to explore this feeling more deeply?",
        "I'm listening carefully. What would help you feel most supported right now?",
        "I appreciate you sharing this. How has this been affecting your daily life?",
        "That sounds difficult. Would it help to explore this from a different angle?",
    ],
    ..TemplateSet::EMPTY
};

static POSITIVE: TemplateSet = TemplateSet {
    initial: &[
        "I'm glad you're feeling better! What helped this improvement? Noticing what works helps.",
        "That's progress! Consider writing down what helped. It creates a personal toolkit.",
        "That's wonderful to hear! What do you think contributed to this positive shift?",
        "I'm happy to hear you're feeling better! How can you build on this positive moment?",
    ],
    ..TemplateSet::EMPTY
};

static FAREWELL: TemplateSet = TemplateSet {
    initial: &[
        "We need to conclude, but remember you can reach out again anytime you need support.",
        "Our time is ending, but your healing journey continues. You're stronger than you think.",
        "We have to conclude now, but remember: progress isn't linear. Be gentle with yourself.",
        "We're out of time, but remember: small steps forward still count. Keep going.",
    ],
    ..TemplateSet::EMPTY
};

/// Template set for an intent tag; unknown tags get the general set
pub fn templates(intent: &str) -> &'static TemplateSet {
    match intent {
        "depression" => &DEPRESSION,
        "anxiety" => &ANXIETY,
        "trauma" => &TRAUMA,
        "self_harm" => &SELF_HARM,
        "suicide_risk" => &SUICIDE_RISK,
        "greeting" => &GREETING,
        "positive" => &POSITIVE,
        "farewell" => &FAREWELL,
        _ => &GENERAL,
    }
}

/// A curated support resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEntry {
    pub label: &'static str,
    pub contact: &'static str,
}

impl fmt::Display for ResourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.contact)
    }
}

const fn entry(label: &'static str, contact: &'static str) -> ResourceEntry {
    ResourceEntry { label, contact }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCategory {
    Depression,
    Anxiety,
    Crisis,
    Therapy,
}

impl ResourceCategory {
    /// Resource category attached to responses for an intent
    pub fn for_intent(intent: &str) -> Option<Self> {
        match intent {
            "depression" => Some(Self::Depression),
            "anxiety" => Some(Self::Anxiety),
            "suicide_risk" | "self_harm" => Some(Self::Crisis),
            "trauma" => Some(Self::Therapy),
            _ => None,
        }
    }

    pub fn entries(self) -> &'static [ResourceEntry] {
        match self {
            Self::Depression => DEPRESSION_RESOURCES,
            Self::Anxiety => ANXIETY_RESOURCES,
            Self::Crisis => CRISIS_RESOURCES,
            Self::Therapy => THERAPY_RESOURCES,
        }
    }
}

static DEPRESSION_RESOURCES: &[ResourceEntry] = &[
    entry("Depression Toolkit", "www.depressiontoolkit.org (self-help tools)"),
    entry("Daily Mood Tracker", "www.moodtools.org (free app)"),
    entry("Online CBT Program", "www.moodgym.com.au (evidence-based)"),
    entry("Free Therapy Worksheets", "www.therapistaid.com/therapy-worksheets/depression"),
    entry("Local Support Groups", "www.nami.org/Support-Education/Support-Groups"),
];

static ANXIETY_RESOURCES: &[ResourceEntry] = &[
    entry("Anxiety Canada", "www.anxietycanada.com (free courses)"),
    entry("DARE Anxiety App", "www.dareresponse.com (evidence-based help)"),
    entry("NAMI HelpLine", "1-800-950-NAMI (6264)"),
    entry("Breathing Exercises", "www.helpguide.org/articles/stress/relaxation-techniques.htm"),
];

static CRISIS_RESOURCES: &[ResourceEntry] = &[
    entry("Suicide & Crisis Lifeline", "Call/text 988 24/7"),
    entry("Crisis Text Line", "Text HOME to 741741"),
    entry("Veterans Crisis Line", "988 then press 1"),
    entry("Trevor Project (LGBTQ+)", "1-866-488-7386"),
    entry("Trans Lifeline", "1-877-565-8860"),
    entry("SAMHSA Treatment Locator", "1-800-662-HELP (4357)"),
];

static THERAPY_RESOURCES: &[ResourceEntry] = &[
    entry("Psychology Today", "www.psychologytoday.com (search therapists)"),
    entry("Open Path", "www.openpathcollective.org (reduced-fee sessions)"),
    entry("Community Mental Health Centers", "Provide low-income options"),
    entry("Employee Assistance Programs", "Check if your employer offers sessions"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_intent_uses_general() {
        assert!(std::ptr::eq(templates("sleep"), &GENERAL));
        assert!(std::ptr::eq(templates("general"), &GENERAL));
        assert!(!std::ptr::eq(templates("anxiety"), &GENERAL));
    }

    #[test]
    fn test_general_pool_excludes_follow_up() {
        let pool = templates("depression").general_pool();
        let first_question = DEPRESSION.follow_up[0].1[0];
        assert!(!pool.contains(&first_question));
        assert!(pool.contains(&DEPRESSION.actionable[0]));
    }

    #[test]
    fn test_every_set_has_openers() {
        for tag in ["depression", "anxiety", "trauma", "self_harm", "suicide_risk", "greeting", "general", "positive", "farewell"] {
            assert!(!templates(tag).initial.is_empty(), "{} has no initial templates", tag);
        }
    }

    #[test]
    fn test_crisis_resources_reference_hotline() {
        let crisis = ResourceCategory::for_intent("self_harm").unwrap().entries();
        assert!(crisis.iter().any(|r| r.to_string().contains("988")));
        assert_eq!(ResourceCategory::for_intent("greeting"), None);
    }
}
