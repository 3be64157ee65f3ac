//! The ordered intent rules.
//!
//! Order is precedence. Student questions and "what do you do" questions are
//! checked before program, event and impact keywords; the fixed topics come
//! next, and greeting, gratitude and contact keywords last, since almost any
//! message can contain a "hi".

use stemchat_knowledge::ProgramKind;

use super::render;
use super::{Intent, Knowledge, Query};

type Matcher = Box<dyn Fn(&Query, &Knowledge) -> bool + Send + Sync>;
type Renderer = Box<dyn Fn(&Knowledge) -> Option<String> + Send + Sync>;

/// One `(predicate, renderer)` pair. A renderer returning `None` lets the
/// message fall through to the next rule.
pub struct IntentRule {
    intent: Intent,
    matcher: Matcher,
    renderer: Renderer,
}

impl IntentRule {
    pub fn new(
        intent: Intent,
        matcher: impl Fn(&Query, &Knowledge) -> bool + Send + Sync + 'static,
        renderer: impl Fn(&Knowledge) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            intent,
            matcher: Box::new(matcher),
            renderer: Box::new(renderer),
        }
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn matches(&self, query: &Query, knowledge: &Knowledge) -> bool {
        (self.matcher)(query, knowledge)
    }

    pub fn render(&self, knowledge: &Knowledge) -> Option<String> {
        (self.renderer)(knowledge)
    }
}

impl std::fmt::Debug for IntentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRule")
            .field("intent", &self.intent)
            .finish_non_exhaustive()
    }
}

/// The five fixed topics of the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Volunteering,
    Donations,
    Partnerships,
    Joining,
    Language,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Volunteering,
        Topic::Donations,
        Topic::Partnerships,
        Topic::Joining,
        Topic::Language,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Topic::Volunteering => "volunteering",
            Topic::Donations => "donations",
            Topic::Partnerships => "partnerships",
            Topic::Joining => "joining",
            Topic::Language => "language",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Topic::Volunteering => &["volunteer", "mentor"],
            Topic::Donations => &["donat", "fund", "sponsor", "contribute", "give money"],
            Topic::Partnerships => &["partner", "collaborat", "work with you"],
            Topic::Joining => &["join", "apply", "application", "enrol", "register", "sign up"],
            Topic::Language => &["language", "amharic", "english", "translat", "speak"],
        }
    }
}

const STUDENT: &[&str] = &["student", "pupil", "learner", "high school", "secondary school"];

const STEM_CENTER: &[&str] = &[
    "stem center",
    "stem centre",
    "science center",
    "science centre",
    "center",
    "centre",
];
const FABLAB: &[&str] = &[
    "fablab",
    "fab lab",
    "fabrication",
    "maker",
    "3d print",
    "laser cut",
    "prototyp",
];
const ENTREPRENEURSHIP: &[&str] = &[
    "entrepreneur",
    "startup",
    "start-up",
    "incubat",
    "business",
];
const BROADCAST: &[&str] = &["broadcast", "media", "television", "radio", "video"];
const BROADCAST_WORDS: &[&str] = &["tv"];

const EVENTS: &[&str] = &[
    "event",
    "schedule",
    "upcoming",
    "calendar",
    "workshop",
    "competition",
    "science fair",
    "happening",
];

const IMPACT: &[&str] = &[
    "impact",
    "statistic",
    "stats",
    "how many",
    "achievement",
    "reached",
    "accomplish",
];

const GREETING_WORDS: &[&str] = &["hi", "hello", "hey", "greetings", "selam", "salam", "hola"];
const GREETING_PHRASES: &[&str] = &["good morning", "good afternoon", "good evening"];

const GRATITUDE: &[&str] = &["thank", "thx", "appreciate", "grateful"];

const CONTACT: &[&str] = &[
    "contact",
    "email",
    "e-mail",
    "phone",
    "address",
    "office",
    "location",
    "located",
    "where are you",
    "reach you",
    "get in touch",
];
const CONTACT_WORDS: &[&str] = &["call"];

fn program_keywords(kind: ProgramKind) -> (&'static [&'static str], &'static [&'static str]) {
    match kind {
        ProgramKind::StemCenters => (STEM_CENTER, &[]),
        ProgramKind::FabLab => (FABLAB, &[]),
        ProgramKind::Entrepreneurship => (ENTREPRENEURSHIP, &[]),
        ProgramKind::Broadcast => (BROADCAST, BROADCAST_WORDS),
    }
}

/// "What is / what does the organization do" phrasing.
fn is_overview_question(query: &Query, knowledge: &Knowledge) -> bool {
    let org = knowledge.organization_name.trim().to_lowercase();
    let mentions_org = !org.is_empty() && query.contains(&org);

    (query.contains("basic") && (query.contains("work") || mentions_org))
        || (query.has_word("what")
            && (query.has_word("do") || query.contains("work") || mentions_org))
        || query.contains("tell me about")
}

/// Every rule, in precedence order.
pub fn ordered_rules() -> Vec<IntentRule> {
    let mut rules = vec![
        IntentRule::new(
            Intent::Student,
            |q, _| q.contains_any(STUDENT),
            |k| Some(render::student(k)),
        ),
        IntentRule::new(Intent::Overview, is_overview_question, |k| {
            Some(render::overview(k))
        }),
    ];

    for kind in ProgramKind::ALL {
        let (phrases, words) = program_keywords(kind);
        rules.push(IntentRule::new(
            Intent::Program(kind),
            move |q, _| q.contains_any(phrases) || q.has_any_word(words),
            move |k| render::program(k, kind),
        ));
    }

    rules.push(IntentRule::new(
        Intent::Events,
        |q, _| q.contains_any(EVENTS),
        render::events,
    ));
    rules.push(IntentRule::new(
        Intent::Impact,
        |q, _| q.contains_any(IMPACT),
        render::impact,
    ));

    for topic in Topic::ALL {
        rules.push(IntentRule::new(
            Intent::Topic(topic),
            move |q, _| q.contains_any(topic.keywords()),
            move |k| Some(render::topic(k, topic)),
        ));
    }

    rules.push(IntentRule::new(
        Intent::Greeting,
        |q, _| q.has_any_word(GREETING_WORDS) || q.contains_any(GREETING_PHRASES),
        |k| Some(render::greeting(k)),
    ));
    rules.push(IntentRule::new(
        Intent::Gratitude,
        |q, _| q.contains_any(GRATITUDE),
        |k| Some(render::gratitude(k)),
    ));
    rules.push(IntentRule::new(
        Intent::Contact,
        |q, _| q.contains_any(CONTACT) || q.has_any_word(CONTACT_WORDS),
        |k| Some(render::contact(k)),
    ));
    rules.push(IntentRule::new(
        Intent::Default,
        |_, _| true,
        |k| Some(render::menu(k)),
    ));

    rules
}
