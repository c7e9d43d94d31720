//! Location subsystem for firemap.
//!
//! Candidate and resolved-location types, the place-search capability with
//! its providers, the geocode cache, and the fallback-ladder geocoder.

pub mod cache;
pub mod providers;
pub mod resolver;
pub mod types;

pub use cache::{CachedSearch, GeoCache};
pub use providers::{NominatimSearch, OfflineSearch, PlaceSearch, StaticSearch};
pub use resolver::{GeocodeHit, Geocoder, DEFAULT_FALLBACK_SUFFIXES};
pub use types::{
    format_coords, CandidateTarget, Coordinates, LocationCandidate, LocationError, LocationSource,
    ResolvedLocation,
};
