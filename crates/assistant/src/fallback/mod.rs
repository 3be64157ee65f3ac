//! Rule-based answers for when the LLM is unavailable.
//!
//! A message is matched against an ordered list of [`IntentRule`]s; the first
//! rule that matches and renders an answer wins. Overlapping keywords are
//! resolved purely by that order: a substantive question that happens to
//! contain "hi" is answered by the earlier, more specific rule.

mod render;
mod rules;

pub use rules::{IntentRule, Topic};

use std::sync::Arc;
use stemchat_knowledge::{
    ContactInfo, EventEntry, KnowledgeCache, KnowledgeSnapshot, OrganizationProfile,
    ProgramCollections, ProgramKind, StaticFacts, scrub, scrub_all,
};
use tracing::debug;

use crate::text::clean;

/// What a message was understood to be about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Student,
    Overview,
    Program(ProgramKind),
    Events,
    Impact,
    Topic(Topic),
    Greeting,
    Gratitude,
    Contact,
    Default,
}

impl Intent {
    /// Short label for logs, e.g. `program:fablab`.
    pub fn label(&self) -> String {
        match self {
            Intent::Student => "student".into(),
            Intent::Overview => "overview".into(),
            Intent::Program(kind) => format!("program:{}", render::program_slug(*kind)),
            Intent::Events => "events".into(),
            Intent::Impact => "impact".into(),
            Intent::Topic(topic) => format!("topic:{}", topic.slug()),
            Intent::Greeting => "greeting".into(),
            Intent::Gratitude => "gratitude".into(),
            Intent::Contact => "contact".into(),
            Intent::Default => "default".into(),
        }
    }
}

/// A user message, normalized once for matching.
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    words: Vec<String>,
}

impl Query {
    pub fn new(message: &str) -> Self {
        let text = message.trim().to_lowercase();
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { text, words }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substring match, for phrases and word stems.
    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Whole-word match, for short words like "hi" or "do".
    pub fn has_word(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    pub fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.contains(n))
    }

    pub fn has_any_word(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.has_word(w))
    }
}

/// The snapshot as the answer engine may use it: database records scrubbed
/// of placeholder content, static facts untouched.
#[derive(Debug, Clone)]
pub struct Knowledge {
    pub organization_name: String,
    pub facts: Arc<StaticFacts>,
    pub profile: Option<OrganizationProfile>,
    pub programs: ProgramCollections,
    pub events: Vec<EventEntry>,
    pub contact: Option<ContactInfo>,
}

impl Knowledge {
    pub fn from_snapshot(snapshot: &KnowledgeSnapshot, organization_name: &str) -> Self {
        let mut programs = ProgramCollections::default();
        for category in stemchat_knowledge::ProgramCategory::ALL {
            *programs.get_mut(category) = scrub_all(snapshot.programs.get(category));
        }

        Self {
            organization_name: organization_name.to_string(),
            facts: Arc::clone(&snapshot.static_facts),
            profile: snapshot.organization_profile.as_ref().and_then(scrub),
            programs,
            events: scrub_all(&snapshot.events),
            contact: snapshot.contact.as_ref().and_then(scrub),
        }
    }

    /// Whether there is anything organization-specific to talk about.
    pub fn has_facts(&self) -> bool {
        self.facts.has_content()
            || self.profile.is_some()
            || self.programs.total() > 0
            || !self.events.is_empty()
            || self.contact.is_some()
    }
}

/// Resolves messages with the ordered rules against the cached snapshot.
pub struct FallbackEngine {
    cache: Arc<KnowledgeCache>,
    organization_name: String,
    rules: Vec<IntentRule>,
}

impl FallbackEngine {
    pub fn new(cache: Arc<KnowledgeCache>, organization_name: impl Into<String>) -> Self {
        Self {
            cache,
            organization_name: organization_name.into(),
            rules: rules::ordered_rules(),
        }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Answer `message` from the rules. Always returns non-empty plain text.
    pub async fn resolve(&self, message: &str) -> String {
        let knowledge = self.knowledge().await;
        let (intent, answer) = self.answer(message, &knowledge);
        debug!(intent = %intent.label(), "Fallback answer resolved");
        answer
    }

    /// The intent that would answer `message` right now.
    pub async fn classify(&self, message: &str) -> Intent {
        let knowledge = self.knowledge().await;
        self.answer(message, &knowledge).0
    }

    /// Run the rules against already prepared knowledge.
    pub fn answer(&self, message: &str, knowledge: &Knowledge) -> (Intent, String) {
        let query = Query::new(message);
        for rule in &self.rules {
            if !rule.matches(&query, knowledge) {
                continue;
            }
            if let Some(answer) = rule.render(knowledge) {
                let answer = clean(&answer);
                if !answer.is_empty() {
                    return (rule.intent(), answer);
                }
            }
        }
        // The default rule always renders; this only guards a broken rule list.
        (Intent::Default, clean(&render::capabilities(knowledge)))
    }

    async fn knowledge(&self) -> Knowledge {
        let snapshot = self.cache.snapshot().await;
        Knowledge::from_snapshot(&snapshot, &self.organization_name)
    }
}
