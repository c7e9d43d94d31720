//! Geocoder: the place-name fallback ladder.
//!
//! Flow: name → name + " fire" → name + " wildfire" → name + " emergency"
//! → name + " incident" → give up. One search call per rung, first hit wins.
//! A transport failure and an empty result both just move to the next rung.

use tracing::{debug, warn};

use super::providers::PlaceSearch;
use super::types::Coordinates;

/// Query suffixes tried in order; "" is the bare name.
pub const DEFAULT_FALLBACK_SUFFIXES: &[&str] = &["", " fire", " wildfire", " emergency", " incident"];

/// A successful ladder run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub coords: Coordinates,
    /// The query that produced the hit.
    pub query: String,
    /// Number of search calls made, including the successful one.
    pub attempts: usize,
}

/// Resolves place names through a [`PlaceSearch`] with fallback suffixes.
pub struct Geocoder<S> {
    search: S,
    suffixes: Vec<String>,
}

impl<S: PlaceSearch> Geocoder<S> {
    pub fn new(search: S) -> Self {
        Self::with_suffixes(search, DEFAULT_FALLBACK_SUFFIXES.iter().map(|s| s.to_string()).collect())
    }

    /// An empty suffix list still tries the bare name.
    pub fn with_suffixes(search: S, suffixes: Vec<String>) -> Self {
        let suffixes = if suffixes.is_empty() { vec![String::new()] } else { suffixes };
        Self { search, suffixes }
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Walk the ladder. `None` once every rung has failed.
    pub async fn geocode(&self, name: &str) -> Option<GeocodeHit> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        for (i, suffix) in self.suffixes.iter().enumerate() {
            let query = format!("{}{}", name, suffix);
            match self.search.search(&query).await {
                Ok(coords) if coords.is_finite() => {
                    debug!(name, query = %query, attempt = i + 1, "geocoded");
                    return Some(GeocodeHit {
                        coords,
                        query,
                        attempts: i + 1,
                    });
                }
                Ok(_) => debug!(query = %query, "non-finite coordinates, trying next"),
                Err(e) => debug!(query = %query, error = %e, "no result, trying next"),
            }
        }

        warn!(name, attempts = self.suffixes.len(), "could not geocode location");
        None
    }
}
