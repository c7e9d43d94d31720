//! Place-search providers: Nominatim, an offline stand-in, and a static
//! table for deterministic lookups.

use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::types::{Coordinates, LocationError};
use crate::config::GeocodingConfig;

/// Text-to-coordinate lookup capability.
///
/// One call is one query against the service; only the best match is
/// returned. Every failure is an error, callers decide whether to care.
pub trait PlaceSearch: Send + Sync {
    fn search(&self, query: &str) -> impl Future<Output = Result<Coordinates, LocationError>> + Send;
}

impl<T: PlaceSearch> PlaceSearch for Arc<T> {
    fn search(&self, query: &str) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        (**self).search(query)
    }
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
pub struct NominatimResult {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl NominatimResult {
    /// Parse the decimal-string coordinates.
    pub fn coordinates(&self) -> Result<Coordinates, LocationError> {
        let lat: f64 = self
            .lat
            .trim()
            .parse()
            .map_err(|_| LocationError::InvalidResponse(format!("bad latitude '{}'", self.lat)))?;
        let lng: f64 = self
            .lon
            .trim()
            .parse()
            .map_err(|_| LocationError::InvalidResponse(format!("bad longitude '{}'", self.lon)))?;

        let coords = Coordinates::new(lat, lng);
        if !coords.is_finite() {
            return Err(LocationError::InvalidResponse("non-finite coordinates".into()));
        }
        Ok(coords)
    }
}

/// Use the first entry of a search response.
pub fn first_result(query: &str, results: &[NominatimResult]) -> Result<Coordinates, LocationError> {
    results
        .first()
        .ok_or_else(|| LocationError::NotFound(query.to_string()))?
        .coordinates()
}

/// OpenStreetMap Nominatim (or any compatible `/search` endpoint).
#[derive(Clone)]
pub struct NominatimSearch {
    agent: ureq::Agent,
    endpoint: String,
    limit: u32,
}

impl NominatimSearch {
    pub fn new(config: &GeocodingConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            endpoint: config.endpoint.clone(),
            limit: config.result_limit.max(1),
        }
    }

    fn lookup(&self, query: &str) -> Result<Coordinates, LocationError> {
        let response = self
            .agent
            .get(&self.endpoint)
            .query("q", query)
            .query("format", "json")
            .query("limit", &self.limit.to_string())
            .call()
            .map_err(|e| LocationError::Network(e.to_string()))?;

        let results: Vec<NominatimResult> = response
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        debug!(query, results = results.len(), "nominatim response");
        first_result(query, &results)
    }
}

impl PlaceSearch for NominatimSearch {
    fn search(&self, query: &str) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        let this = self.clone();
        let query = query.to_string();
        async move {
            tokio::task::spawn_blocking(move || this.lookup(&query))
                .await
                .map_err(|e| LocationError::Network(format!("lookup task failed: {}", e)))?
        }
    }
}

// ─── Offline provider ───────────────────────────────────────────

/// Answers every query with [`LocationError::Offline`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSearch;

impl PlaceSearch for OfflineSearch {
    fn search(&self, query: &str) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        let err = LocationError::Offline(query.to_string());
        async move { Err(err) }
    }
}

// ─── Static table ───────────────────────────────────────────────

/// Fixed query → coordinates table. Keys are case-insensitive. Records
/// every query it receives, in order.
#[derive(Debug, Default)]
pub struct StaticSearch {
    entries: HashMap<String, Coordinates>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, lat: f64, lng: f64) -> Self {
        self.entries.insert(query.to_lowercase(), Coordinates::new(lat, lng));
        self
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().map(|q| q.len()).unwrap_or_default()
    }
}

impl PlaceSearch for StaticSearch {
    fn search(&self, query: &str) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        if let Ok(mut q) = self.queries.lock() {
            q.push(query.to_string());
        }
        let result = self
            .entries
            .get(&query.to_lowercase())
            .copied()
            .ok_or_else(|| LocationError::NotFound(query.to_string()));
        async move { result }
    }
}
