//! firemap turns generated wildfire answers into map annotations.
//!
//! Text goes through the [`extract`] pattern families, the resulting
//! candidates are resolved by the [`location`] fallback ladder, and the
//! [`map`] annotator places classified markers on a [`map::MapSession`].

pub mod config;
pub mod extract;
pub mod location;
pub mod map;

pub use config::Config;
pub use extract::{extract, Extractor, Severity};
pub use location::{Coordinates, LocationCandidate, ResolvedLocation};
pub use map::{MapAnnotator, MapSession, MarkerKind};
