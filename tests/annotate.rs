//! End-to-end runs of extraction, the geocoding ladder and the annotator
//! against a stub search.

use approx::assert_relative_eq;
use std::sync::Arc;
use std::time::Duration;

use firemap::config::{BatchConfig, MapConfig};
use firemap::extract::{extract, infer_severity, Extractor, Severity};
use firemap::location::{Coordinates, Geocoder, LocationSource, StaticSearch};
use firemap::map::{MapAnnotator, MapEvent, MapSession, MarkerDefaults, MarkerKind};

const ANSWER: &str = "\
Fire reported near Paradise, severity: extreme. \
Crews are staging after a blaze in Chico spread overnight. \
A second fire at 39.76°N, 121.62°W is burning in grass.";

fn search() -> Arc<StaticSearch> {
    Arc::new(
        StaticSearch::new()
            .with("Paradise", 39.76, -121.62)
            .with("Chico", 39.73, -121.84),
    )
}

fn build_annotator(search: Arc<StaticSearch>, delay_ms: u64) -> MapAnnotator<Arc<StaticSearch>> {
    let batch = BatchConfig {
        delay_ms,
        ..BatchConfig::default()
    };
    MapAnnotator::new(MapSession::new(MapConfig::default()), Geocoder::new(search), batch)
}

#[test]
fn plain_prose_has_no_candidates() {
    assert!(extract("nothing to see here, just lowercase prose").is_empty());
    assert!(extract("The in at").is_empty());
}

#[test]
fn severity_from_candidate_context() {
    let found = extract("Fire reported near Paris, severity: high");
    let paris = found
        .iter()
        .find(|c| c.name().is_some_and(|n| n.contains("Paris")))
        .expect("Paris candidate");
    assert_eq!(infer_severity(&paris.context), Severity::High);
}

#[test]
fn key_value_pair_is_one_candidate() {
    let found = extract("lat: 34.05, lng: -118.25");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].coordinates(), Some(Coordinates::new(34.05, -118.25)));
}

#[tokio::test]
async fn whole_answer_is_annotated_in_order() {
    let search = search();
    let annotator = build_annotator(search.clone(), 0);
    let report = annotator
        .annotate_text(&Extractor::default(), ANSWER, &MarkerDefaults::default())
        .await;

    let labels: Vec<String> = annotator.markers().iter().map(|m| m.location.label.clone()).collect();
    assert!(labels.contains(&"Paradise".to_string()), "labels: {:?}", labels);
    assert!(labels.contains(&"Chico".to_string()), "labels: {:?}", labels);
    assert_eq!(report.placed.len(), 3);
    assert!(report.unresolved.is_empty());

    let paradise = annotator
        .markers()
        .into_iter()
        .find(|m| m.location.label == "Paradise")
        .expect("Paradise marker");
    assert_eq!(paradise.location.severity, Severity::Extreme);

    let literal = annotator
        .markers()
        .into_iter()
        .find(|m| m.location.source == LocationSource::Literal)
        .expect("literal coordinate marker");
    assert_relative_eq!(literal.location.lat, 39.76);
    assert_relative_eq!(literal.location.lng, -121.62);
}

#[tokio::test]
async fn ladder_places_marker_at_suffixed_hit() {
    let search = Arc::new(StaticSearch::new().with("Dixie fire", 40.05, -121.2));
    let annotator = build_annotator(search.clone(), 0);
    let candidate = firemap::location::LocationCandidate::named(
        "Dixie",
        "the Dixie complex",
        firemap::extract::PatternFamily::Narrative,
    );

    let id = annotator
        .resolve_and_add(&candidate, &MarkerDefaults::default())
        .await
        .expect("placed");
    let marker = annotator.markers().into_iter().find(|m| m.id == id).unwrap();
    assert_eq!(marker.location.coordinates(), Coordinates::new(40.05, -121.2));
    assert_eq!(search.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn clear_mid_batch_suppresses_pending() {
    let annotator = Arc::new(build_annotator(search(), 200));
    let candidates = Extractor::default().extract(ANSWER);
    assert_eq!(candidates.len(), 3);

    let batch = {
        let annotator = annotator.clone();
        let candidates = candidates.clone();
        tokio::spawn(async move {
            annotator
                .annotate(&candidates, &MarkerDefaults::default())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    annotator.clear();
    let report = batch.await.unwrap();

    assert!(annotator.markers().is_empty());
    assert_eq!(report.placed.len(), 1);
    assert_eq!(report.cancelled, candidates.len() - 1);
}

#[tokio::test]
async fn overrides_win_over_inference() {
    let annotator = build_annotator(search(), 0);
    let defaults = MarkerDefaults {
        severity: Some(Severity::Low),
        description: Some("staging area".into()),
        kind: Some(MarkerKind::Crew),
    };
    annotator
        .annotate_text(&Extractor::default(), "A blaze in Chico is spreading.", &defaults)
        .await;

    let markers = annotator.markers();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].kind, MarkerKind::Crew);
    assert_eq!(markers[0].popup.description, "staging area");
    assert_eq!(markers[0].popup.severity_label, "LOW");
}

#[tokio::test]
async fn placement_emits_fly_to() {
    let annotator = build_annotator(search(), 0);
    annotator
        .annotate_text(&Extractor::default(), "Fire near Chico.", &MarkerDefaults::default())
        .await;

    let events = annotator.take_events();
    assert!(events.iter().any(|e| matches!(e, MapEvent::MarkerAdded { .. })));
    assert!(events.iter().any(|e| matches!(e, MapEvent::FlyTo { .. })));
}
