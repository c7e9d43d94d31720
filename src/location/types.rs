//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::extract::{PatternFamily, Severity};
use crate::map::MarkerKind;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Finite and inside the WGS84 lat/lng ranges.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// What a candidate points at: a place name or a literal coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateTarget {
    Name(String),
    Coordinates(Coordinates),
}

/// An unresolved location mention pulled out of generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    #[serde(flatten)]
    pub target: CandidateTarget,
    /// Text window around the match, used for severity and kind inference.
    pub context: String,
    pub family: PatternFamily,
}

impl LocationCandidate {
    pub fn named(name: impl Into<String>, context: impl Into<String>, family: PatternFamily) -> Self {
        Self {
            target: CandidateTarget::Name(name.into()),
            context: context.into(),
            family,
        }
    }

    pub fn at(coords: Coordinates, context: impl Into<String>) -> Self {
        Self {
            target: CandidateTarget::Coordinates(coords),
            context: context.into(),
            family: PatternFamily::Coordinates,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.target {
            CandidateTarget::Name(n) => Some(n),
            CandidateTarget::Coordinates(_) => None,
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match &self.target {
            CandidateTarget::Name(_) => None,
            CandidateTarget::Coordinates(c) => Some(*c),
        }
    }

    /// Deduplication key: lowercase name, or the stringified pair.
    pub fn dedup_key(&self) -> String {
        match &self.target {
            CandidateTarget::Name(n) => n.to_lowercase(),
            CandidateTarget::Coordinates(c) => c.to_string(),
        }
    }

    /// Human-readable label for popups and logs.
    pub fn label(&self) -> String {
        match &self.target {
            CandidateTarget::Name(n) => n.clone(),
            CandidateTarget::Coordinates(c) => format_coords(c.lat, c.lng),
        }
    }
}

/// How a location was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationSource {
    /// Geocoded by the search service; `query` is the ladder step that hit.
    Geocoded { query: String },
    /// Literal coordinates from the text, passed through.
    Literal,
    Manual,
    Plan,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geocoded { query } => write!(f, "Geocoded ({})", query),
            Self::Literal => write!(f, "Literal"),
            Self::Manual => write!(f, "Manual"),
            Self::Plan => write!(f, "Plan"),
        }
    }
}

/// A location with coordinates, ready to become a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub lat: f64,
    pub lng: f64,
    pub label: String,
    #[serde(default)]
    pub severity: Severity,
    /// Icon classifier; `None` renders as a fire marker.
    #[serde(default)]
    pub kind: Option<MarkerKind>,
    #[serde(default)]
    pub description: Option<String>,
    pub source: LocationSource,
    /// The extracted mention this came from. Direct placements have none.
    #[serde(default)]
    pub source_candidate: Option<LocationCandidate>,
}

impl ResolvedLocation {
    /// A manually placed location with default severity.
    pub fn manual(lat: f64, lng: f64, label: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            label: label.into(),
            severity: Severity::default(),
            kind: None,
            description: None,
            source: LocationSource::Manual,
            source_candidate: None,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Location resolution errors.
///
/// The geocoding ladder treats every variant as "no result".
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("location not found: '{0}'")]
    NotFound(String),

    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    #[error("offline: no lookup for '{0}'")]
    Offline(String),
}

/// Format coordinates as "34.0500°N, 118.2500°W".
pub fn format_coords(lat: f64, lng: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lng >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", lat.abs(), ns, lng.abs(), ew)
}
