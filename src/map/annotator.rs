//! Map annotator: resolves candidates and places markers on a session.
//!
//! All methods take `&self`; the session sits behind a mutex that is never
//! held across an await, so one annotator can be shared between the batch
//! task and whatever issues `clear()`.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::marker::{Marker, MarkerHandle, MarkerKind, Popup};
use super::plan::PlanResponse;
use super::session::{MapEvent, MapSession, MapView};
use crate::config::{BatchConfig, Config};
use crate::extract::{classify_kind, infer_severity, Extractor, Severity};
use crate::location::{
    CandidateTarget, Geocoder, LocationCandidate, LocationSource, PlaceSearch, ResolvedLocation,
};

/// Overrides applied to every candidate of a call. Unset fields are
/// inferred from the candidate's context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerDefaults {
    pub severity: Option<Severity>,
    pub description: Option<String>,
    pub kind: Option<MarkerKind>,
}

/// Input of [`MapAnnotator::add_fire_marker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireMarkerData {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Markers placed, in extraction order.
    pub placed: Vec<MarkerHandle>,
    /// Labels of candidates the ladder could not resolve.
    pub unresolved: Vec<String>,
    /// Candidates skipped because the batch was cancelled.
    pub cancelled: usize,
}

pub struct MapAnnotator<S> {
    session: Mutex<MapSession>,
    geocoder: Geocoder<S>,
    batch: BatchConfig,
    cancel: Mutex<CancellationToken>,
}

impl<S: PlaceSearch> MapAnnotator<S> {
    pub fn new(session: MapSession, geocoder: Geocoder<S>, batch: BatchConfig) -> Self {
        Self {
            session: Mutex::new(session),
            geocoder,
            batch,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Session, ladder and batch policy all taken from `config`.
    pub fn from_config(config: &Config, search: S) -> Self {
        Self::new(
            MapSession::new(config.map.clone()),
            Geocoder::with_suffixes(search, config.geocoding.fallback_suffixes.clone()),
            config.batch.clone(),
        )
    }

    pub fn geocoder(&self) -> &Geocoder<S> {
        &self.geocoder
    }

    fn session(&self) -> MutexGuard<'_, MapSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn token(&self) -> CancellationToken {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    // ─── Direct placement ────────────────────────────────────────

    /// Place a resolved location. A no-op (logged) when lat/lng are not
    /// finite numbers. The camera does not move.
    pub fn add_marker(&self, resolved: ResolvedLocation) -> Option<MarkerHandle> {
        if !resolved.coordinates().is_finite() {
            warn!(label = %resolved.label, lat = resolved.lat, lng = resolved.lng, "invalid marker data, skipped");
            return None;
        }
        Some(self.session().add_marker(resolved))
    }

    /// A fire marker whose popup shows `name`, `description` and the
    /// severity in upper case.
    pub fn add_fire_marker(&self, data: FireMarkerData) -> Option<MarkerHandle> {
        self.add_marker(ResolvedLocation {
            lat: data.lat,
            lng: data.lng,
            label: data.name,
            severity: data.severity,
            kind: Some(MarkerKind::Fire),
            description: Some(data.description),
            source: LocationSource::Manual,
            source_candidate: None,
        })
    }

    /// Place every categorised marker of a planning response.
    pub fn apply_plan(&self, plan: &PlanResponse) -> Vec<MarkerHandle> {
        plan.markers
            .iter()
            .filter_map(|(kind, point)| self.add_marker(point.to_resolved(kind)))
            .collect()
    }

    // ─── Resolution ──────────────────────────────────────────────

    /// Turn a candidate into a location: literal coordinates pass through,
    /// names go through the geocoding ladder.
    pub async fn resolve(&self, candidate: &LocationCandidate, defaults: &MarkerDefaults) -> Option<ResolvedLocation> {
        let (coords, source) = match &candidate.target {
            CandidateTarget::Coordinates(c) => (*c, LocationSource::Literal),
            CandidateTarget::Name(name) => {
                let hit = self.geocoder.geocode(name).await?;
                (hit.coords, LocationSource::Geocoded { query: hit.query })
            }
        };

        let context = candidate.context.trim();
        Some(ResolvedLocation {
            lat: coords.lat,
            lng: coords.lng,
            label: candidate.label(),
            severity: defaults.severity.unwrap_or_else(|| infer_severity(context)),
            kind: Some(defaults.kind.unwrap_or_else(|| classify_kind(context))),
            description: defaults
                .description
                .clone()
                .or_else(|| (!context.is_empty()).then(|| context.to_string())),
            source,
            source_candidate: Some(candidate.clone()),
        })
    }

    /// Resolve, place, and move the camera to the new marker. `None` when
    /// the ladder is exhausted; no marker is created then.
    pub async fn resolve_and_add(&self, candidate: &LocationCandidate, defaults: &MarkerDefaults) -> Option<MarkerHandle> {
        let resolved = self.resolve(candidate, defaults).await?;
        self.place_and_focus(resolved)
    }

    fn place_and_focus(&self, resolved: ResolvedLocation) -> Option<MarkerHandle> {
        let (lat, lng) = (resolved.lat, resolved.lng);
        let label = resolved.label.clone();
        let id = self.add_marker(resolved)?;
        self.session().focus_on(lat, lng);
        info!(%id, label = %label, lat, lng, "placed marker");
        Some(id)
    }

    // ─── Batches ─────────────────────────────────────────────────

    /// Resolve and place candidates one at a time, in order, pausing
    /// `delay_ms` between items. The cancellation token is checked before
    /// every placement.
    pub async fn annotate(&self, candidates: &[LocationCandidate], defaults: &MarkerDefaults) -> BatchReport {
        let token = self.token();
        let delay = self.batch.delay();
        let mut report = BatchReport::default();

        for (i, candidate) in candidates.iter().enumerate() {
            if i > 0 {
                pause(delay, &token).await;
            }
            if token.is_cancelled() {
                report.cancelled = candidates.len() - i;
                break;
            }

            let Some(resolved) = self.resolve(candidate, defaults).await else {
                report.unresolved.push(candidate.label());
                continue;
            };

            if token.is_cancelled() {
                report.cancelled = candidates.len() - i;
                break;
            }
            if let Some(id) = self.place_and_focus(resolved) {
                report.placed.push(id);
            }
        }

        if report.cancelled > 0 {
            info!(skipped = report.cancelled, "batch cancelled");
        }
        report
    }

    /// Extract candidates from `text` and run them as one batch.
    pub async fn annotate_text(&self, extractor: &Extractor, text: &str, defaults: &MarkerDefaults) -> BatchReport {
        let candidates = extractor.extract(text);
        self.annotate(&candidates, defaults).await
    }

    /// Cancel the running batch without touching the markers.
    pub fn cancel_pending(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }

    // ─── View and marker set ─────────────────────────────────────

    /// Remove every marker; the view is untouched. Also cancels a running
    /// batch unless `clear_cancels_pending` is off.
    pub fn clear(&self) {
        if self.batch.clear_cancels_pending {
            self.cancel_pending();
        }
        self.session().clear();
    }

    pub fn reset_view(&self) {
        self.session().reset_view();
    }

    pub fn focus_on(&self, lat: f64, lng: f64) -> Option<MarkerHandle> {
        self.session().focus_on(lat, lng)
    }

    pub fn view(&self) -> MapView {
        self.session().view()
    }

    /// Snapshot of the current markers.
    pub fn markers(&self) -> Vec<Marker> {
        self.session().markers().to_vec()
    }

    pub fn popup(&self, id: MarkerHandle) -> Option<Popup> {
        self.session().marker(id).map(|m| m.popup.clone())
    }

    /// Drain the render events. Front ends should drain regularly; the
    /// session keeps at most [`super::session::MAX_QUEUED_EVENTS`].
    pub fn take_events(&self) -> Vec<MapEvent> {
        self.session().take_events()
    }

    /// Run `f` with the session locked. Do not await inside.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut MapSession) -> R) -> R {
        let mut session = self.session();
        f(&mut *session)
    }
}

async fn pause(delay: Duration, token: &CancellationToken) {
    if delay.is_zero() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = token.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PatternFamily;
    use crate::location::{Coordinates, StaticSearch};
    use approx::assert_relative_eq;

    fn annotator(search: StaticSearch, delay_ms: u64) -> MapAnnotator<StaticSearch> {
        MapAnnotator::new(
            MapSession::default(),
            Geocoder::new(search),
            BatchConfig {
                delay_ms,
                clear_cancels_pending: true,
            },
        )
    }

    fn named(name: &str, context: &str) -> LocationCandidate {
        LocationCandidate::named(name, context, PatternFamily::Structured)
    }

    #[test]
    fn test_add_marker_rejects_non_finite() {
        let ann = annotator(StaticSearch::new(), 0);
        assert!(ann.add_marker(ResolvedLocation::manual(f64::NAN, 1.0, "bad")).is_none());
        assert!(ann.markers().is_empty());
    }

    #[test]
    fn test_add_marker_default_fire_icon() {
        let ann = annotator(StaticSearch::new(), 0);
        let id = ann.add_marker(ResolvedLocation::manual(1.0, 2.0, "x")).unwrap();
        let markers = ann.markers();
        assert_eq!(markers[0].id, id);
        assert_eq!(markers[0].kind, MarkerKind::Fire);
    }

    #[test]
    fn test_fire_marker_popup_round_trip() {
        let ann = annotator(StaticSearch::new(), 0);
        let id = ann
            .add_fire_marker(FireMarkerData {
                lat: 38.5,
                lng: -122.7,
                name: "Glass Fire".into(),
                description: "Spreading toward Calistoga".into(),
                severity: Severity::High,
            })
            .unwrap();

        let popup = ann.popup(id).unwrap();
        assert_eq!(popup.title, "Glass Fire");
        assert_eq!(popup.description, "Spreading toward Calistoga");
        assert_eq!(popup.severity_label, "HIGH");
    }

    #[test]
    fn test_reset_add_clear_leaves_view() {
        let ann = annotator(StaticSearch::new(), 0);
        ann.reset_view();
        ann.add_marker(ResolvedLocation::manual(34.05, -118.25, "LA"));
        ann.clear();

        assert!(ann.markers().is_empty());
        let view = ann.view();
        assert_eq!(view.center, Coordinates::new(20.0, 0.0));
        assert_eq!(view.zoom, 3);
    }

    #[tokio::test]
    async fn test_ladder_second_rung_places_marker() {
        let ann = annotator(StaticSearch::new().with("Dixie fire", 40.05, -121.2), 0);
        let id = ann
            .resolve_and_add(&named("Dixie", "fire at Dixie"), &MarkerDefaults::default())
            .await
            .unwrap();

        let marker = ann.markers().into_iter().find(|m| m.id == id).unwrap();
        assert_relative_eq!(marker.location.lat, 40.05);
        assert_relative_eq!(marker.location.lng, -121.2);
        assert_eq!(ann.geocoder().search().call_count(), 2);
        assert_eq!(ann.geocoder().search().queries(), vec!["Dixie", "Dixie fire"]);
    }

    #[tokio::test]
    async fn test_unresolvable_name_creates_nothing() {
        let ann = annotator(StaticSearch::new(), 0);
        assert!(ann
            .resolve_and_add(&named("Atlantis", ""), &MarkerDefaults::default())
            .await
            .is_none());
        assert!(ann.markers().is_empty());
        assert_eq!(ann.geocoder().search().call_count(), 5);
    }

    #[tokio::test]
    async fn test_literal_coordinates_skip_geocoding() {
        let ann = annotator(StaticSearch::new(), 0);
        let candidate = LocationCandidate::at(Coordinates::new(34.05, -118.25), "lat: 34.05, lng: -118.25");
        assert!(ann.resolve_and_add(&candidate, &MarkerDefaults::default()).await.is_some());
        assert_eq!(ann.geocoder().search().call_count(), 0);
        assert_eq!(ann.markers()[0].location.source, LocationSource::Literal);
    }

    #[tokio::test]
    async fn test_resolve_and_add_focuses_marker() {
        let ann = annotator(StaticSearch::new().with("Paris", 48.85, 2.35), 0);
        ann.resolve_and_add(&named("Paris", "near Paris"), &MarkerDefaults::default())
            .await
            .unwrap();
        assert_eq!(ann.view().center, Coordinates::new(48.85, 2.35));
        assert!(ann
            .take_events()
            .iter()
            .any(|e| matches!(e, MapEvent::PopupOpened { .. })));
    }

    #[tokio::test]
    async fn test_defaults_override_inference() {
        let ann = annotator(StaticSearch::new().with("Paris", 48.85, 2.35), 0);
        let defaults = MarkerDefaults {
            severity: Some(Severity::Low),
            description: Some("Reported by user".into()),
            kind: Some(MarkerKind::Emergency),
        };
        ann.resolve_and_add(&named("Paris", "severity: extreme"), &defaults)
            .await
            .unwrap();
        let markers = ann.markers();
        let m = &markers[0];
        assert_eq!(m.location.severity, Severity::Low);
        assert_eq!(m.kind, MarkerKind::Emergency);
        assert_eq!(m.popup.description, "Reported by user");
    }

    #[tokio::test]
    async fn test_severity_inferred_from_context() {
        let ann = annotator(StaticSearch::new().with("Paris", 48.85, 2.35), 0);
        ann.resolve_and_add(&named("Paris", "Fire reported near Paris, severity: high"), &MarkerDefaults::default())
            .await
            .unwrap();
        assert_eq!(ann.markers()[0].popup.severity_label, "HIGH");
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_reports_failures() {
        let search = StaticSearch::new().with("Paris", 48.85, 2.35).with("Lyon", 45.76, 4.83);
        let ann = annotator(search, 0);
        let candidates = vec![named("Paris", ""), named("Atlantis", ""), named("Lyon", "")];

        let report = ann.annotate(&candidates, &MarkerDefaults::default()).await;
        assert_eq!(report.placed.len(), 2);
        assert_eq!(report.unresolved, vec!["Atlantis"]);
        assert_eq!(report.cancelled, 0);

        let labels: Vec<String> = ann.markers().into_iter().map(|m| m.location.label).collect();
        assert_eq!(labels, vec!["Paris", "Lyon"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_batch_suppresses_pending() {
        let ann = annotator(StaticSearch::new(), 200);
        let candidates = vec![
            LocationCandidate::at(Coordinates::new(1.0, 1.0), ""),
            LocationCandidate::at(Coordinates::new(2.0, 2.0), ""),
            LocationCandidate::at(Coordinates::new(3.0, 3.0), ""),
        ];

        let defaults = MarkerDefaults::default();
        let (report, _) = tokio::join!(ann.annotate(&candidates, &defaults), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ann.clear();
        });

        assert_eq!(report.placed.len(), 1);
        assert_eq!(report.cancelled, 2);
        assert!(ann.markers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_without_cancel_lets_batch_finish() {
        let ann = MapAnnotator::new(
            MapSession::default(),
            Geocoder::new(StaticSearch::new()),
            BatchConfig {
                delay_ms: 100,
                clear_cancels_pending: false,
            },
        );
        let candidates = vec![
            LocationCandidate::at(Coordinates::new(1.0, 1.0), ""),
            LocationCandidate::at(Coordinates::new(2.0, 2.0), ""),
        ];

        let defaults = MarkerDefaults::default();
        let (report, _) = tokio::join!(ann.annotate(&candidates, &defaults), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            ann.clear();
        });

        assert_eq!(report.placed.len(), 2);
        assert_eq!(ann.markers().len(), 1);
    }

    #[tokio::test]
    async fn test_new_batch_after_clear_runs() {
        let ann = annotator(StaticSearch::new(), 0);
        ann.clear();
        let report = ann
            .annotate(&[LocationCandidate::at(Coordinates::new(1.0, 1.0), "")], &MarkerDefaults::default())
            .await;
        assert_eq!(report.placed.len(), 1);
    }
}
