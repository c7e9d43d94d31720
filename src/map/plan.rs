//! Manual placement side-channel: the planning request sent after a map
//! click in placing mode, and the categorised markers that come back.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::marker::MarkerKind;
use crate::config::PlanningConfig;
use crate::extract::Severity;
use crate::location::{LocationError, LocationSource, ResolvedLocation};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// One point of a planning response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanPoint {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "lon", alias = "longitude")]
    pub lng: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanMarkers {
    pub fire: Vec<PlanPoint>,
    pub crew: Vec<PlanPoint>,
    pub hospital: Vec<PlanPoint>,
    pub water_source: Vec<PlanPoint>,
    pub safe_zone: Vec<PlanPoint>,
}

impl PlanMarkers {
    /// Every point with the kind of the list it came from, in list order
    /// (fire, crew, hospital, water source, safe zone).
    pub fn iter(&self) -> impl Iterator<Item = (MarkerKind, &PlanPoint)> {
        [
            (MarkerKind::Fire, &self.fire),
            (MarkerKind::Crew, &self.crew),
            (MarkerKind::Hospital, &self.hospital),
            (MarkerKind::WaterSource, &self.water_source),
            (MarkerKind::SafeZone, &self.safe_zone),
        ]
        .into_iter()
        .flat_map(|(kind, points)| points.iter().map(move |p| (kind, p)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Planning endpoint reply: a free-form plan plus categorised markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    #[serde(default)]
    pub plan: serde_json::Value,
    #[serde(default)]
    pub markers: PlanMarkers,
}

impl PlanPoint {
    pub fn to_resolved(&self, kind: MarkerKind) -> ResolvedLocation {
        let label = self
            .name
            .clone()
            .unwrap_or_else(|| default_label(kind).to_string());
        ResolvedLocation {
            lat: self.lat,
            lng: self.lng,
            label,
            severity: self.severity.as_deref().and_then(Severity::parse).unwrap_or_default(),
            kind: Some(kind),
            description: self.description.clone(),
            source: LocationSource::Plan,
            source_candidate: None,
        }
    }
}

fn default_label(kind: MarkerKind) -> &'static str {
    match kind {
        MarkerKind::Fire => "Fire",
        MarkerKind::Emergency => "Emergency",
        MarkerKind::Weather => "Weather",
        MarkerKind::Crew => "Crew",
        MarkerKind::Hospital => "Hospital",
        MarkerKind::WaterSource => "Water source",
        MarkerKind::SafeZone => "Safe zone",
    }
}

/// HTTP client for the planning endpoint.
#[derive(Clone)]
pub struct PlanningClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl PlanningClient {
    pub fn new(config: &PlanningConfig, timeout: std::time::Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: config.endpoint.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn request_plan(&self, request: PlanRequest) -> Result<PlanResponse, LocationError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.post(request))
            .await
            .map_err(|e| LocationError::Network(format!("planning task failed: {}", e)))?
    }

    fn post(&self, request: PlanRequest) -> Result<PlanResponse, LocationError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .send_json(request)
            .map_err(|e| LocationError::Network(e.to_string()))?;

        let plan: PlanResponse = response
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
        debug!(endpoint = %self.endpoint, markers = plan.markers.len(), "plan received");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "plan": {"summary": "Hold the ridge line"},
        "markers": {
            "fire": [{"lat": 34.1, "lng": -118.2, "name": "Origin", "severity": "extreme"}],
            "crew": [{"latitude": 34.2, "longitude": -118.3}],
            "water_source": [{"lat": 34.3, "lon": -118.4, "name": "Reservoir"}]
        }
    }"#;

    #[test]
    fn test_parse_partial_response() {
        let plan: PlanResponse = serde_json::from_str(BODY).unwrap();
        assert_eq!(plan.markers.len(), 3);
        assert!(plan.markers.hospital.is_empty());
        assert_eq!(plan.plan["summary"], "Hold the ridge line");
    }

    #[test]
    fn test_iter_order_and_kinds() {
        let plan: PlanResponse = serde_json::from_str(BODY).unwrap();
        let kinds: Vec<MarkerKind> = plan.markers.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![MarkerKind::Fire, MarkerKind::Crew, MarkerKind::WaterSource]);
    }

    #[test]
    fn test_to_resolved() {
        let plan: PlanResponse = serde_json::from_str(BODY).unwrap();
        let fire = plan.markers.fire[0].to_resolved(MarkerKind::Fire);
        assert_eq!(fire.severity, Severity::Extreme);
        assert_eq!(fire.label, "Origin");
        assert_eq!(fire.source, LocationSource::Plan);

        let crew = plan.markers.crew[0].to_resolved(MarkerKind::Crew);
        assert_eq!(crew.label, "Crew");
        assert_eq!(crew.severity, Severity::Medium);
    }

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_value(PlanRequest { latitude: 1.5, longitude: -2.5 }).unwrap();
        assert_eq!(json, serde_json::json!({"latitude": 1.5, "longitude": -2.5}));
    }
}
