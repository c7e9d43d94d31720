//! Markers: classified icons with a bound popup.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extract::Severity;
use crate::location::ResolvedLocation;

/// Opaque id of a marker inside one `MapSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerHandle(pub u64);

impl fmt::Display for MarkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// Icon classifier for a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    #[default]
    Fire,
    Emergency,
    Weather,
    Crew,
    Hospital,
    WaterSource,
    SafeZone,
}

impl MarkerKind {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Fire => "\u{1F525}",
            Self::Emergency => "\u{1F6A8}",
            Self::Weather => "\u{26C8}\u{FE0F}",
            Self::Crew => "\u{1F692}",
            Self::Hospital => "\u{1F3E5}",
            Self::WaterSource => "\u{1F4A7}",
            Self::SafeZone => "\u{1F6E1}\u{FE0F}",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Emergency => "emergency",
            Self::Weather => "weather",
            Self::Crew => "crew",
            Self::Hospital => "hospital",
            Self::WaterSource => "water_source",
            Self::SafeZone => "safe_zone",
        }
    }
}

/// Custom icon content for the render target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerIcon {
    pub glyph: String,
    pub color: String,
    pub class_name: String,
}

impl MarkerIcon {
    /// Kind picks the glyph, severity the colour.
    pub fn for_location(kind: MarkerKind, severity: Severity) -> Self {
        Self {
            glyph: kind.glyph().to_string(),
            color: severity.color().to_string(),
            class_name: format!("marker-{} severity-{}", kind.as_str().replace('_', "-"), severity.as_str()),
        }
    }
}

/// Info popup bound to a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Popup {
    pub title: String,
    pub description: String,
    /// Severity in upper case, e.g. "HIGH".
    pub severity_label: String,
}

impl Popup {
    pub fn for_location(location: &ResolvedLocation) -> Self {
        Self {
            title: location.label.clone(),
            description: location.description.clone().unwrap_or_default(),
            severity_label: location.severity.label(),
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = format!("<strong>{}</strong>", escape_html(&self.title));
        if !self.description.is_empty() {
            html.push_str(&format!("<br>{}", escape_html(&self.description)));
        }
        html.push_str(&format!("<br>Severity: {}", escape_html(&self.severity_label)));
        html
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A rendered map annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerHandle,
    pub kind: MarkerKind,
    pub location: ResolvedLocation,
    pub icon: MarkerIcon,
    pub popup: Popup,
}

impl Marker {
    pub fn new(id: MarkerHandle, location: ResolvedLocation) -> Self {
        let kind = location.kind.unwrap_or_default();
        Self {
            id,
            kind,
            icon: MarkerIcon::for_location(kind, location.severity),
            popup: Popup::for_location(&location),
            location,
        }
    }

    pub fn is_at(&self, lat: f64, lng: f64) -> bool {
        const EPS: f64 = 1e-9;
        (self.location.lat - lat).abs() < EPS && (self.location.lng - lng).abs() < EPS
    }
}
