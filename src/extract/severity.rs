//! Severity and marker-kind inference over a context string.
//!
//! Both are pure functions over text: an ordered rule list, first match
//! wins, with a fixed default when nothing matches.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::map::MarkerKind;

/// Coarse qualitative rank used for marker styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }

    /// Uppercase label shown in popups.
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Marker fill colour.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#2e7d32",
            Self::Medium => "#f9a825",
            Self::High => "#ef6c00",
            Self::Extreme => "#b71c1c",
        }
    }

    /// Parse a level word. "moderate" is accepted for medium.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            "extreme" => Some(Self::Extreme),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn explicit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bseverity\s*(?:level)?\s*[:=]?\s*(low|medium|moderate|high|extreme)\b")
            .expect("explicit severity regex must compile")
    })
}

fn severity_rules() -> &'static [(Regex, Severity)] {
    static RULES: OnceLock<Vec<(Regex, Severity)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (
                r"(?i)\b(?:extreme|catastrophic|out of control|uncontained|firestorm|explosive growth)\b",
                Severity::Extreme,
            ),
            (
                r"(?i)\b(?:high|severe|major|rapidly spreading|spreading rapidly|dangerous|critical|large)\b",
                Severity::High,
            ),
            (r"(?i)\b(?:medium|moderate)\b", Severity::Medium),
            (
                r"(?i)\b(?:low|minor|small|contained|under control|smoldering)\b",
                Severity::Low,
            ),
        ]
        .into_iter()
        .map(|(p, s)| (Regex::new(p).expect("severity rule must compile"), s))
        .collect()
    })
}

/// Map a context string to a severity. Defaults to `Medium`.
pub fn infer_severity(context: &str) -> Severity {
    if let Some(level) = explicit_re()
        .captures(context)
        .and_then(|c| c.get(1))
        .and_then(|m| Severity::parse(m.as_str()))
    {
        return level;
    }

    severity_rules()
        .iter()
        .find(|(re, _)| re.is_match(context))
        .map(|(_, s)| *s)
        .unwrap_or_default()
}

fn kind_rules() -> &'static [(Regex, MarkerKind)] {
    static RULES: OnceLock<Vec<(Regex, MarkerKind)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (
                r"(?i)\b(?:red flag warning|wind|winds|gusts?|storm|thunderstorms?|lightning|humidity|heat wave|weather)\b",
                MarkerKind::Weather,
            ),
            (
                r"(?i)\b(?:evacuat\w*|emergency|shelters?|rescue|road closures?|closed roads?)\b",
                MarkerKind::Emergency,
            ),
        ]
        .into_iter()
        .map(|(p, k)| (Regex::new(p).expect("kind rule must compile"), k))
        .collect()
    })
}

/// Pick the icon class for a mention. Defaults to `Fire`.
pub fn classify_kind(context: &str) -> MarkerKind {
    kind_rules()
        .iter()
        .find(|(re, _)| re.is_match(context))
        .map(|(_, k)| *k)
        .unwrap_or_default()
}
