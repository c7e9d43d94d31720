//! File-based geocode cache at ~/.firemap/geocache.json.
//!
//! TTL: 30 days. Case-insensitive keys. Only successful lookups are stored,
//! so a place that failed once is retried next time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::providers::PlaceSearch;
use super::types::{Coordinates, LocationError};

const CACHE_TTL_MS: i64 = 30 * 24 * 3600 * 1000; // 30 days in ms

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    lat: f64,
    lng: f64,
    timestamp: i64,
    #[serde(default)]
    query: Option<String>,
}

/// The geocode cache.
pub struct GeoCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl GeoCache {
    /// Load cache from the default location (~/.firemap/geocache.json).
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load cache from a specific path.
    pub fn load_from(path: PathBuf) -> Self {
        let entries = Self::read_file(&path).unwrap_or_default();
        Self { path, entries }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".firemap")
            .join("geocache.json")
    }

    fn read_file(path: &Path) -> Option<HashMap<String, CacheEntry>> {
        let data = fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    /// Look up a query. Returns None if missing or expired.
    pub fn get(&self, query: &str) -> Option<Coordinates> {
        let entry = self.entries.get(&query.to_lowercase())?;

        let now = chrono::Utc::now().timestamp_millis();
        if now - entry.timestamp > CACHE_TTL_MS {
            return None; // expired
        }
        Some(Coordinates::new(entry.lat, entry.lng))
    }

    /// Store a hit and persist to disk.
    pub fn put(&mut self, query: &str, coords: Coordinates) {
        self.entries.insert(
            query.to_lowercase(),
            CacheEntry {
                lat: coords.lat,
                lng: coords.lng,
                timestamp: chrono::Utc::now().timestamp_millis(),
                query: Some(query.to_string()),
            },
        );
        self.persist();
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.entries) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "could not write geocode cache");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize geocode cache"),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A [`PlaceSearch`] that answers from a [`GeoCache`] first and records
/// successful lookups of the inner provider.
pub struct CachedSearch<S> {
    inner: S,
    cache: Mutex<GeoCache>,
}

impl<S> CachedSearch<S> {
    pub fn new(inner: S, cache: GeoCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
        }
    }

    fn cached(&self, query: &str) -> Option<Coordinates> {
        self.cache.lock().ok()?.get(query)
    }

    fn remember(&self, query: &str, coords: Coordinates) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(query, coords);
        }
    }
}

impl<S: PlaceSearch> PlaceSearch for CachedSearch<S> {
    fn search(&self, query: &str) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        async move {
            if let Some(coords) = self.cached(query) {
                debug!(query, "geocode cache hit");
                return Ok(coords);
            }
            let coords = self.inner.search(query).await?;
            self.remember(query, coords);
            Ok(coords)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::StaticSearch;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_cache() -> (GeoCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocache.json");
        (GeoCache::load_from(path), dir)
    }

    #[test]
    fn test_cache_put_get() {
        let (mut cache, _dir) = test_cache();
        cache.put("Paris fire", Coordinates::new(48.85, 2.35));

        let hit = cache.get("paris FIRE").unwrap();
        assert!((hit.lat - 48.85).abs() < 1e-9);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_miss() {
        let (cache, _dir) = test_cache();
        assert!(cache.get("nowhere").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("geocache.json");
        {
            let mut cache = GeoCache::load_from(path.clone());
            cache.put("Redding", Coordinates::new(40.58, -122.39));
        }
        let reloaded = GeoCache::load_from(path);
        assert_eq!(reloaded.get("redding"), Some(Coordinates::new(40.58, -122.39)));
    }

    #[test]
    fn test_expired_entry_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocache.json");
        fs::write(&path, r#"{"old": {"lat": 1.0, "lng": 2.0, "timestamp": 0}}"#).unwrap();

        let cache = GeoCache::load_from(path);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("old").is_none());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocache.json");
        fs::write(&path, "not json").unwrap();
        assert!(GeoCache::load_from(path).is_empty());
    }

    #[tokio::test]
    async fn test_cached_search_hits_inner_once() {
        let (cache, _dir) = test_cache();
        let inner = Arc::new(StaticSearch::new().with("Paris", 48.85, 2.35));
        let search = CachedSearch::new(Arc::clone(&inner), cache);

        assert!(search.search("Paris").await.is_ok());
        assert!(search.search("PARIS").await.is_ok());
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cached_search_does_not_store_misses() {
        let (cache, _dir) = test_cache();
        let inner = Arc::new(StaticSearch::new());
        let search = CachedSearch::new(Arc::clone(&inner), cache);

        assert!(search.search("Nowhere").await.is_err());
        assert!(search.search("Nowhere").await.is_err());
        assert_eq!(inner.call_count(), 2);
    }
}
