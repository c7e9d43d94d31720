//! Pattern families for location mentions.
//!
//! Families are scanned in declaration order; within a family, patterns in
//! list order; within a pattern, left to right. That order is the order
//! candidates are emitted in before deduplication.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::filter::{clean_name, is_valid_location_name};
use crate::location::{CandidateTarget, Coordinates};

/// A run of up to five capitalised words, optionally led by "St.".
const NAME: &str = r"((?:St\.[ \t]+)?[A-Z][\p{L}'\-]*(?:[ \t]+[A-Z][\p{L}'\-]*){0,4})";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    /// "location: X", "fire at X", "reported near X".
    Structured,
    /// "city of X", "X National Forest", "X County".
    Geographic,
    /// "fire has broken out in X", "blaze in X".
    Narrative,
    /// Decimal-degree pairs and lat/lng key-value pairs.
    Coordinates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateForm {
    /// `34.05°N, 118.25°W`; the hemisphere letter sets the sign.
    Hemisphere,
    /// `lat: 34.05, lng: -118.25`; signs taken as written.
    KeyValue,
}

/// One typed matcher. Name matchers capture the place in group 1;
/// coordinate matchers use the named groups `lat`/`lng` (plus `ns`/`ew`).
#[derive(Debug)]
pub enum Matcher {
    Name { family: PatternFamily, re: Regex },
    Coordinate { re: Regex, form: CoordinateForm },
}

/// A raw hit: byte offset of the match start and what it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub start: usize,
    pub target: CandidateTarget,
}

impl Matcher {
    pub fn family(&self) -> PatternFamily {
        match self {
            Self::Name { family, .. } => *family,
            Self::Coordinate { .. } => PatternFamily::Coordinates,
        }
    }

    /// All accepted hits in `text`. Rejected names and unparsable pairs
    /// are dropped here.
    pub fn scan(&self, text: &str) -> Vec<RawMatch> {
        match self {
            Self::Name { re, .. } => re
                .captures_iter(text)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let name = clean_name(caps.get(1)?.as_str());
                    if !is_valid_location_name(&name) {
                        return None;
                    }
                    Some(RawMatch {
                        start: whole.start(),
                        target: CandidateTarget::Name(name),
                    })
                })
                .collect(),
            Self::Coordinate { re, form } => re
                .captures_iter(text)
                .filter_map(|caps| {
                    let start = caps.get(0)?.start();
                    let coords = parse_pair(&caps, *form)?;
                    Some(RawMatch {
                        start,
                        target: CandidateTarget::Coordinates(coords),
                    })
                })
                .collect(),
        }
    }
}

fn parse_pair(caps: &Captures<'_>, form: CoordinateForm) -> Option<Coordinates> {
    let mut lat: f64 = caps.name("lat")?.as_str().parse().ok()?;
    let mut lng: f64 = caps.name("lng")?.as_str().parse().ok()?;

    if form == CoordinateForm::Hemisphere {
        if caps.name("ns").map(|m| m.as_str()) == Some("S") {
            lat = -lat.abs();
        }
        if caps.name("ew").map(|m| m.as_str()) == Some("W") {
            lng = -lng.abs();
        }
    }

    let coords = Coordinates::new(lat, lng);
    coords.is_valid().then_some(coords)
}

fn name_matcher(family: PatternFamily, prefix: &str) -> Matcher {
    let pattern = format!("{}{}", prefix, NAME);
    Matcher::Name {
        family,
        re: Regex::new(&pattern).expect("name pattern must compile"),
    }
}

fn build() -> Vec<Matcher> {
    use PatternFamily::{Geographic, Narrative, Structured};

    vec![
        // Structured mentions
        name_matcher(Structured, r"(?i:\blocation)[ \t]*:[ \t]*"),
        name_matcher(Structured, r"(?i:\bfires?[ \t]+(?:at|near))[ \t]+"),
        name_matcher(Structured, r"(?i:\breported[ \t]+(?:near|in|at))[ \t]+"),
        // Geographic entities
        name_matcher(Geographic, r"(?i:\bcity[ \t]+of)[ \t]+"),
        Matcher::Name {
            family: Geographic,
            re: Regex::new(
                r"\b([A-Z][\p{L}'\-]*(?:[ \t]+[A-Z][\p{L}'\-]*){0,3}[ \t]+(?:National[ \t]+(?:Forest|Park|Monument|Recreation[ \t]+Area)|State[ \t]+(?:Park|Forest)|County))\b",
            )
            .expect("geographic suffix pattern must compile"),
        },
        // Natural-language narrative
        name_matcher(Narrative, r"(?i:\bfire[ \t]+has[ \t]+broken[ \t]+out[ \t]+(?:in|near|at))[ \t]+"),
        name_matcher(Narrative, r"(?i:\b(?:blaze|wildfire|brush[ \t]+fire|fire)s?[ \t]+(?:in|near))[ \t]+"),
        name_matcher(Narrative, r"(?i:\bburning[ \t]+(?:in|near|outside))[ \t]+"),
        // Coordinate pairs
        Matcher::Coordinate {
            re: Regex::new(
                r"(?P<lat>[-+]?\d{1,3}(?:\.\d+)?)[ \t]*°?[ \t]*(?P<ns>[NS])\b[ \t,;/]*(?P<lng>[-+]?\d{1,3}(?:\.\d+)?)[ \t]*°?[ \t]*(?P<ew>[EW])\b",
            )
            .expect("hemisphere pattern must compile"),
            form: CoordinateForm::Hemisphere,
        },
        Matcher::Coordinate {
            re: Regex::new(
                r"(?i)\blat(?:itude)?[ \t]*[:=][ \t]*(?P<lat>[-+]?\d+(?:\.\d+)?)[ \t]*[,;]?[ \t]*(?:lng|lon|long|longitude)[ \t]*[:=][ \t]*(?P<lng>[-+]?\d+(?:\.\d+)?)",
            )
            .expect("key-value pattern must compile"),
            form: CoordinateForm::KeyValue,
        },
    ]
}

/// The ordered matcher list, compiled once.
pub fn matchers() -> &'static [Matcher] {
    static MATCHERS: OnceLock<Vec<Matcher>> = OnceLock::new();
    MATCHERS.get_or_init(build)
}
