//! Map annotation: session state, markers, the annotator that feeds them,
//! and the planning side-channel.

pub mod annotator;
pub mod marker;
pub mod plan;
pub mod session;

pub use annotator::{BatchReport, FireMarkerData, MapAnnotator, MarkerDefaults};
pub use marker::{Marker, MarkerHandle, MarkerIcon, MarkerKind, Popup};
pub use plan::{PlanMarkers, PlanPoint, PlanRequest, PlanResponse, PlanningClient};
pub use session::{MapEvent, MapSession, MapView, MAX_QUEUED_EVENTS};
