use std::future::Future;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use firemap::config::Config;
use firemap::extract::{classify_kind, infer_severity, Extractor, Severity};
use firemap::location::{
    CachedSearch, Coordinates, GeoCache, Geocoder, LocationCandidate, LocationError,
    NominatimSearch, OfflineSearch, PlaceSearch,
};
use firemap::map::{
    BatchReport, MapAnnotator, MapEvent, Marker, MarkerDefaults, MarkerKind, PlanRequest,
    PlanningClient,
};

/// firemap: place wildfire answer locations on a map
///
/// Pulls place names and coordinates out of generated text, geocodes them
/// through a fallback ladder and emits markers plus map events as JSON.
///
/// Examples:
///   firemap extract "Fire reported near Paradise, severity: high."
///   echo "The fire at 34.05°N, 118.25°W is spreading." | firemap annotate
///   firemap geocode "Lahaina"
///   firemap plan --lat 39.76 --lng -121.62
#[derive(Parser)]
#[command(name = "firemap", version, about, long_about = None)]
struct Cli {
    /// Config file. Defaults to <config dir>/firemap/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List location candidates with inferred severity and kind.
    Extract {
        /// Answer text. Read from stdin when absent.
        text: Option<String>,
    },

    /// Infer the severity of a piece of text.
    Severity { text: String },

    /// Geocode a place name through the fallback ladder.
    Geocode {
        name: String,

        #[arg(long)]
        no_cache: bool,
    },

    /// Extract, resolve and place markers for an answer.
    Annotate {
        /// Answer text. Read from stdin when absent.
        text: Option<String>,

        /// Pause between placements, overriding the config.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Never touch the network; only literal coordinates resolve.
        #[arg(long)]
        offline: bool,

        #[arg(long)]
        no_cache: bool,
    },

    /// Request a response plan for a point and place its markers.
    Plan {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
}

// ─── Search backend ─────────────────────────────────────────────

/// The place search chosen from flags and config.
enum Search {
    Offline(OfflineSearch),
    Online(NominatimSearch),
    Cached(CachedSearch<NominatimSearch>),
}

impl Search {
    fn build(config: &Config, offline: bool, no_cache: bool) -> Self {
        if offline {
            return Self::Offline(OfflineSearch);
        }
        let online = NominatimSearch::new(&config.geocoding);
        if no_cache || !config.geocoding.cache {
            return Self::Online(online);
        }
        let cache = match &config.geocoding.cache_path {
            Some(path) => GeoCache::load_from(path.clone()),
            None => GeoCache::load(),
        };
        Self::Cached(CachedSearch::new(online, cache))
    }
}

impl PlaceSearch for Search {
    fn search(&self, query: &str) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        async move {
            match self {
                Self::Offline(s) => s.search(query).await,
                Self::Online(s) => s.search(query).await,
                Self::Cached(s) => s.search(query).await,
            }
        }
    }
}

// ─── Output shapes ──────────────────────────────────────────────

#[derive(Serialize)]
struct ExtractedCandidate {
    #[serde(flatten)]
    candidate: LocationCandidate,
    severity: Severity,
    kind: MarkerKind,
}

#[derive(Serialize)]
struct AnnotateOutput {
    report: BatchReport,
    markers: Vec<Marker>,
    events: Vec<MapEvent>,
}

#[derive(Serialize)]
struct GeocodeOutput {
    name: String,
    query: String,
    attempts: usize,
    lat: f64,
    lng: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load config")?;

    match cli.command {
        Command::Extract { text } => {
            let text = read_text(text)?;
            let extractor = Extractor::new(config.extract.context_window);
            let candidates: Vec<ExtractedCandidate> = extractor
                .extract(&text)
                .into_iter()
                .map(|candidate| ExtractedCandidate {
                    severity: infer_severity(&candidate.context),
                    kind: classify_kind(&candidate.context),
                    candidate,
                })
                .collect();
            print_json(&candidates)
        }

        Command::Severity { text } => {
            println!("{}", infer_severity(&text).as_str());
            Ok(())
        }

        Command::Geocode { name, no_cache } => {
            let search = Search::build(&config, false, no_cache);
            let geocoder = Geocoder::with_suffixes(search, config.geocoding.fallback_suffixes.clone());
            let Some(hit) = geocoder.geocode(&name).await else {
                bail!("could not geocode '{}'", name);
            };
            print_json(&GeocodeOutput {
                name,
                query: hit.query,
                attempts: hit.attempts,
                lat: hit.coords.lat,
                lng: hit.coords.lng,
            })
        }

        Command::Annotate { text, delay_ms, offline, no_cache } => {
            let text = read_text(text)?;
            let mut config = config;
            if let Some(ms) = delay_ms {
                config.batch.delay_ms = ms;
            }

            let extractor = Extractor::new(config.extract.context_window);
            let annotator = MapAnnotator::from_config(&config, Search::build(&config, offline, no_cache));
            let report = annotator
                .annotate_text(&extractor, &text, &MarkerDefaults::default())
                .await;
            info!(
                placed = report.placed.len(),
                unresolved = report.unresolved.len(),
                "annotation finished"
            );

            print_json(&AnnotateOutput {
                report,
                markers: annotator.markers(),
                events: annotator.take_events(),
            })
        }

        Command::Plan { lat, lng } => {
            if !Coordinates::new(lat, lng).is_valid() {
                bail!("coordinates out of range: {}, {}", lat, lng);
            }
            let client = PlanningClient::new(&config.planning, config.geocoding.timeout());
            let plan = client
                .request_plan(PlanRequest { latitude: lat, longitude: lng })
                .await
                .with_context(|| format!("planning request to {} failed", client.endpoint()))?;

            let annotator = MapAnnotator::from_config(&config, OfflineSearch);
            let placed = annotator.apply_plan(&plan);
            info!(placed = placed.len(), "plan applied");

            print_json(&serde_json::json!({
                "plan": plan.plan,
                "markers": annotator.markers(),
            }))
        }
    }
}

/// The positional text, or all of stdin.
fn read_text(text: Option<String>) -> Result<String> {
    match text {
        Some(t) => Ok(t),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
