//! Intent rule table.
//!
//! Rules are evaluated front-to-back in `RULE_PRIORITY` order and the first
//! rule that detects wins. Several rules are broad keyword checks ("time",
//! "date"), so an utterance containing several trigger words resolves to
//! whichever rule is listed first: "update the wiki" is a Date request.
//!
//! Keyword checks run on the lowercased text. Slot captures run
//! case-insensitively on the trimmed original so values keep their casing.
//! A rule either captures every slot it needs or does not match at all.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Transport keywords only fire on inputs shorter than this
pub const DEFAULT_TRANSPORT_MAX_LEN: usize = 15;

/// Named slot -> captured value
pub type ParameterSet = BTreeMap<&'static str, String>;

/// Rule identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Greeting,
    Time,
    Date,
    OpenYoutube,
    PlayMusic,
    Power,
    SystemStatus,
    Joke,
    MediaControl,
    Preferences,
    OpenApp,
    Weather,
    WeatherPrompt,
    Wikipedia,
    WebSearch,
}

/// Evaluation order. Earlier rules mask later ones.
pub const RULE_PRIORITY: [IntentKind; 15] = [
    IntentKind::Greeting,
    IntentKind::Time,
    IntentKind::Date,
    IntentKind::OpenYoutube,
    IntentKind::PlayMusic,
    IntentKind::Power,
    IntentKind::SystemStatus,
    IntentKind::Joke,
    IntentKind::MediaControl,
    IntentKind::Preferences,
    IntentKind::OpenApp,
    IntentKind::Weather,
    IntentKind::WeatherPrompt,
    IntentKind::Wikipedia,
    IntentKind::WebSearch,
];

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Time => "time",
            Self::Date => "date",
            Self::OpenYoutube => "open_youtube",
            Self::PlayMusic => "play_music",
            Self::Power => "power",
            Self::SystemStatus => "system_status",
            Self::Joke => "joke",
            Self::MediaControl => "media_control",
            Self::Preferences => "preferences",
            Self::OpenApp => "open_app",
            Self::Weather => "weather",
            Self::WeatherPrompt => "weather_prompt",
            Self::Wikipedia => "wikipedia",
            Self::WebSearch => "web_search",
        }
    }

    /// Parse from string (for corpus tests)
    pub fn from_str(s: &str) -> Option<Self> {
        RULE_PRIORITY
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s.trim().to_lowercase())
    }

    /// Position in the evaluation order
    pub fn priority(&self) -> usize {
        RULE_PRIORITY
            .iter()
            .position(|kind| kind == self)
            .unwrap_or(RULE_PRIORITY.len())
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
}

impl PowerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
        }
    }
}

/// A matched rule with its extracted slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Time,
    Date,
    OpenYoutube,
    PlayMusic,
    Power(PowerAction),
    SystemStatus,
    Joke,
    MediaControl { verb: &'static str },
    Preferences,
    OpenApp { name: String },
    Weather { city: String },
    WeatherPrompt,
    Wikipedia { query: String },
    WebSearch { query: String },
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Greeting => IntentKind::Greeting,
            Self::Time => IntentKind::Time,
            Self::Date => IntentKind::Date,
            Self::OpenYoutube => IntentKind::OpenYoutube,
            Self::PlayMusic => IntentKind::PlayMusic,
            Self::Power(_) => IntentKind::Power,
            Self::SystemStatus => IntentKind::SystemStatus,
            Self::Joke => IntentKind::Joke,
            Self::MediaControl { .. } => IntentKind::MediaControl,
            Self::Preferences => IntentKind::Preferences,
            Self::OpenApp { .. } => IntentKind::OpenApp,
            Self::Weather { .. } => IntentKind::Weather,
            Self::WeatherPrompt => IntentKind::WeatherPrompt,
            Self::Wikipedia { .. } => IntentKind::Wikipedia,
            Self::WebSearch { .. } => IntentKind::WebSearch,
        }
    }

    /// Extracted slots keyed by name
    pub fn params(&self) -> ParameterSet {
        let mut params = ParameterSet::new();
        match self {
            Self::Power(action) => {
                params.insert("action", action.as_str().to_string());
            }
            Self::MediaControl { verb } => {
                params.insert("verb", verb.to_string());
            }
            Self::OpenApp { name } => {
                params.insert("app_name", name.clone());
            }
            Self::Weather { city } => {
                params.insert("city", city.clone());
            }
            Self::Wikipedia { query } | Self::WebSearch { query } => {
                params.insert("query", query.clone());
            }
            _ => {}
        }
        params
    }
}

/// One utterance prepared for matching
#[derive(Debug, Clone)]
pub struct Utterance<'a> {
    raw: &'a str,
    lower: String,
}

impl<'a> Utterance<'a> {
    pub fn new(command: &'a str) -> Self {
        let raw = command.trim();
        Self {
            raw,
            lower: raw.to_lowercase(),
        }
    }

    pub fn raw(&self) -> &str {
        self.raw
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn contains(&self, needle: &str) -> bool {
        self.lower.contains(needle)
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.lower.contains(n))
    }

    /// First capture group of the first pattern that matches
    fn capture(&self, patterns: &[Regex]) -> Option<String> {
        patterns
            .iter()
            .filter_map(|re| re.captures(self.raw))
            .find_map(|caps| caps.get(1).and_then(|m| clean_slot(m.as_str())))
    }
}

/// Trim whitespace and trailing sentence punctuation. None if nothing is left.
fn clean_slot(value: &str) -> Option<String> {
    let cleaned = value
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '?' | '!' | ','))
        .trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("intent pattern is a valid regex"))
        .collect()
}

static TRANSPORT_VERB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"play|pause|stop|next|previous").expect("valid regex"));

static APP_OPEN: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"(?i)\b(?:open|launch|start|run|execute)\s+(.+)$"]));

static WEATHER: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)what(?:'|’)?s the weather (?:like )?in\s+(.+)$",
        r"(?i)what is the weather (?:like )?in\s+(.+)$",
        r"(?i)weather in\s+(.+)$",
        r"(?i)weather for\s+(.+)$",
        r"(?i)forecast for\s+(.+)$",
        r"(?i)forecast in\s+(.+)$",
    ])
});

static WIKIPEDIA: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)search wikipedia for\s+(.+)$",
        r"(?i)wikipedia\s+(.+)$",
    ])
});

static WEB_SEARCH: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)search google for\s+(.+)$",
        r"(?i)google search\s+(.+)$",
        r"(?i)search for\s+(.+)$",
        r"(?i)look up\s+(.+)$",
    ])
});

/// Evaluates the rule table
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    transport_max_len: usize,
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSPORT_MAX_LEN)
    }
}

impl IntentMatcher {
    pub fn new(transport_max_len: usize) -> Self {
        Self { transport_max_len }
    }

    /// First matching rule in priority order, None if nothing matches
    pub fn match_intent(&self, command: &str) -> Option<Intent> {
        let utterance = Utterance::new(command);
        if utterance.is_empty() {
            return None;
        }
        RULE_PRIORITY
            .iter()
            .find_map(|kind| self.detect(*kind, &utterance))
    }

    /// Every rule that would fire on its own, in priority order
    pub fn candidates(&self, command: &str) -> Vec<IntentKind> {
        let utterance = Utterance::new(command);
        if utterance.is_empty() {
            return Vec::new();
        }
        RULE_PRIORITY
            .iter()
            .copied()
            .filter(|kind| self.detect(*kind, &utterance).is_some())
            .collect()
    }

    /// Run a single rule's predicate and extraction
    pub fn detect(&self, kind: IntentKind, u: &Utterance<'_>) -> Option<Intent> {
        match kind {
            IntentKind::Greeting => {
                let lower = u.lower();
                (lower.starts_with("hello") || lower == "hi")
                    .then_some(Intent::Greeting)
            }
            IntentKind::Time => u.contains("time").then_some(Intent::Time),
            IntentKind::Date => u.contains("date").then_some(Intent::Date),
            IntentKind::OpenYoutube => u.contains("open youtube").then_some(Intent::OpenYoutube),
            IntentKind::PlayMusic => u.contains("play music").then_some(Intent::PlayMusic),
            IntentKind::Power => {
                if u.contains("shutdown") {
                    Some(Intent::Power(PowerAction::Shutdown))
                } else if u.contains("restart") {
                    Some(Intent::Power(PowerAction::Restart))
                } else {
                    None
                }
            }
            IntentKind::SystemStatus => u.contains("check system").then_some(Intent::SystemStatus),
            IntentKind::Joke => u
                .contains_any(&["tell me a joke", "tell joke"])
                .then_some(Intent::Joke),
            IntentKind::MediaControl => {
                if u.lower().chars().count() >= self.transport_max_len {
                    return None;
                }
                let verb = TRANSPORT_VERB.find(u.lower())?;
                Some(Intent::MediaControl {
                    verb: transport_verb(verb.as_str())?,
                })
            }
            IntentKind::Preferences => u.contains("check preferences").then_some(Intent::Preferences),
            IntentKind::OpenApp => u.capture(&APP_OPEN).map(|name| Intent::OpenApp { name }),
            IntentKind::Weather => u.capture(&WEATHER).map(|city| Intent::Weather { city }),
            IntentKind::WeatherPrompt => u
                .contains_any(&["weather", "forecast"])
                .then_some(Intent::WeatherPrompt),
            IntentKind::Wikipedia => u.capture(&WIKIPEDIA).map(|query| Intent::Wikipedia { query }),
            IntentKind::WebSearch => u.capture(&WEB_SEARCH).map(|query| Intent::WebSearch { query }),
        }
    }
}

fn transport_verb(found: &str) -> Option<&'static str> {
    ["play", "pause", "stop", "next", "previous"]
        .into_iter()
        .find(|verb| *verb == found)
}
