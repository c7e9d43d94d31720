//! One interactive map: view state, marker set, and the render event queue.
//!
//! The session does not draw anything. Every visible change is queued as a
//! [`MapEvent`] which the front-end drains and replays on its map library.
//! The queue is bounded: past [`MAX_QUEUED_EVENTS`] the oldest events are
//! dropped.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::marker::{Marker, MarkerHandle};
use super::plan::PlanRequest;
use crate::config::MapConfig;
use crate::location::{Coordinates, ResolvedLocation};

/// Undrained events kept per session.
pub const MAX_QUEUED_EVENTS: usize = 1024;

/// Camera position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
}

/// A render instruction for the map surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MapEvent {
    Initialized { tile_url: String, attribution: String, view: MapView },
    MarkerAdded { marker: Marker },
    MarkersCleared { removed: Vec<MarkerHandle> },
    ViewReset { view: MapView },
    FlyTo { view: MapView, duration_ms: u64 },
    /// Emitted after the preceding `FlyTo` completes.
    PopupOpened { id: MarkerHandle, html: String },
    PlacementModeChanged { active: bool },
}

#[derive(Debug)]
pub struct MapSession {
    config: MapConfig,
    view: MapView,
    markers: Vec<Marker>,
    next_id: u64,
    placing: bool,
    events: VecDeque<MapEvent>,
    overflowed: bool,
}

impl MapSession {
    pub fn new(config: MapConfig) -> Self {
        let view = default_view(&config);
        let events = VecDeque::from([MapEvent::Initialized {
            tile_url: config.tile_url.clone(),
            attribution: config.attribution.clone(),
            view,
        }]);
        Self {
            config,
            view,
            markers: Vec::new(),
            next_id: 1,
            placing: false,
            events,
            overflowed: false,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, id: MarkerHandle) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Place a marker. Callers are responsible for coordinate validity.
    pub fn add_marker(&mut self, location: ResolvedLocation) -> MarkerHandle {
        let id = MarkerHandle(self.next_id);
        self.next_id += 1;

        let marker = Marker::new(id, location);
        debug!(%id, label = %marker.location.label, kind = marker.kind.as_str(), "marker added");
        self.push_event(MapEvent::MarkerAdded { marker: marker.clone() });
        self.markers.push(marker);
        id
    }

    /// Remove every marker. The view is left where it is.
    pub fn clear(&mut self) -> usize {
        let removed: Vec<MarkerHandle> = self.markers.drain(..).map(|m| m.id).collect();
        let count = removed.len();
        self.push_event(MapEvent::MarkersCleared { removed });
        count
    }

    /// Back to the configured world view.
    pub fn reset_view(&mut self) {
        self.view = default_view(&self.config);
        self.push_event(MapEvent::ViewReset { view: self.view });
    }

    /// Smooth transition to a point, then open the popup of the marker
    /// sitting there (the most recent one, if several).
    pub fn focus_on(&mut self, lat: f64, lng: f64) -> Option<MarkerHandle> {
        self.view = MapView {
            center: Coordinates::new(lat, lng),
            zoom: self.config.focus_zoom,
        };
        self.push_event(MapEvent::FlyTo {
            view: self.view,
            duration_ms: self.config.fly_duration_ms,
        });

        let marker = self.markers.iter().rev().find(|m| m.is_at(lat, lng))?;
        let id = marker.id;
        let html = marker.popup.to_html();
        self.push_event(MapEvent::PopupOpened { id, html });
        Some(id)
    }

    /// Enter "placing" mode: the next map click requests a plan.
    pub fn begin_placement(&mut self) {
        self.set_placing(true);
    }

    pub fn cancel_placement(&mut self) {
        self.set_placing(false);
    }

    pub fn is_placing(&self) -> bool {
        self.placing
    }

    /// A click on the map. Outside placing mode this does nothing; inside,
    /// it leaves placing mode and yields the planning request to send.
    pub fn handle_click(&mut self, lat: f64, lng: f64) -> Option<PlanRequest> {
        if !self.placing {
            return None;
        }
        self.set_placing(false);
        Some(PlanRequest {
            latitude: lat,
            longitude: lng,
        })
    }

    fn set_placing(&mut self, active: bool) {
        if self.placing != active {
            self.placing = active;
            self.push_event(MapEvent::PlacementModeChanged { active });
        }
    }

    /// Drain queued render events, oldest first.
    pub fn take_events(&mut self) -> Vec<MapEvent> {
        self.overflowed = false;
        std::mem::take(&mut self.events).into()
    }

    fn push_event(&mut self, event: MapEvent) {
        if self.events.len() >= MAX_QUEUED_EVENTS {
            if !self.overflowed {
                warn!(limit = MAX_QUEUED_EVENTS, "event queue full, dropping oldest events");
                self.overflowed = true;
            }
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

fn default_view(config: &MapConfig) -> MapView {
    MapView {
        center: Coordinates::new(config.default_center[0], config.default_center[1]),
        zoom: config.default_zoom,
    }
}
