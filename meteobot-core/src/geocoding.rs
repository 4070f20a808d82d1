//! Place name to coordinates lookup, backed by the ArcGIS World geocoder.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{config::Config, model::LocationKey};

const DEFAULT_BASE_URL: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer";
const MAX_LOCATIONS: &str = "10";
const LOCALITY: &str = "Locality";

#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("Failed to reach the geocoding service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Geocoding request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Failed to parse geocoding response: {0}")]
    Payload(String),
    #[error("No locality found for '{place}'")]
    NotFound { place: String },
    #[error("'{place}' matches {} localities", candidates.len())]
    Ambiguous {
        place: String,
        candidates: Vec<LocationPoint>,
    },
}

/// A locality the geocoder offered for a place name.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPoint {
    pub location: LocationKey,
    pub address: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// All distinct localities matching `place`. Never empty on success.
    async fn candidates(&self, place: &str) -> Result<Vec<LocationPoint>, GeocodingError>;

    /// The single locality matching `place`.
    async fn resolve(&self, place: &str) -> Result<LocationKey, GeocodingError> {
        let mut candidates = self.candidates(place).await?;
        match candidates.len() {
            0 => Err(GeocodingError::NotFound { place: place.to_string() }),
            1 => Ok(candidates.remove(0).location),
            _ => Err(GeocodingError::Ambiguous {
                place: place.to_string(),
                candidates,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArcGisGeocoder {
    token: Option<String>,
    base_url: String,
    http: Client,
}

impl ArcGisGeocoder {
    pub fn new(token: Option<String>, http: Client) -> Self {
        Self {
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    /// Geocoder using the configured token and request timeout.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::new(config.geocoding.api_key.clone(), http))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ArcGisPoint {
    x: f64,
    y: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ArcGisAttributes {
    #[serde(rename = "Addr_type")]
    addr_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArcGisCandidate {
    address: String,
    location: ArcGisPoint,
    #[serde(default)]
    attributes: ArcGisAttributes,
}

#[derive(Debug, Deserialize)]
struct ArcGisFault {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArcGisResponse {
    #[serde(default)]
    candidates: Vec<ArcGisCandidate>,
    error: Option<ArcGisFault>,
}

/// Keep localities only and drop repeated coordinates, first one wins.
fn localities(candidates: Vec<ArcGisCandidate>) -> Vec<LocationPoint> {
    let mut points: Vec<LocationPoint> = Vec::new();

    for candidate in candidates {
        if candidate.attributes.addr_type.as_deref() != Some(LOCALITY) {
            continue;
        }
        let location = LocationKey::from_coordinates(candidate.location.y, candidate.location.x);
        if points.iter().any(|p| p.location == location) {
            continue;
        }
        points.push(LocationPoint {
            location,
            address: candidate.address,
        });
    }

    points
}

#[async_trait]
impl Geocoder for ArcGisGeocoder {
    async fn candidates(&self, place: &str) -> Result<Vec<LocationPoint>, GeocodingError> {
        debug!(place, "geocoding place name");

        let mut query = vec![
            ("SingleLine", place),
            ("f", "json"),
            ("maxLocations", MAX_LOCATIONS),
            ("outFields", "Addr_type"),
        ];
        if let Some(token) = self.token.as_deref() {
            query.push(("token", token));
        }

        let res = self
            .http
            .get(format!("{}/findAddressCandidates", self.base_url))
            .query(&query)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            warn!(place, %status, "geocoding request failed");
            return Err(GeocodingError::Status { status, body });
        }

        let parsed: ArcGisResponse =
            serde_json::from_str(&body).map_err(|e| GeocodingError::Payload(e.to_string()))?;

        // ArcGIS reports some failures (bad token, bad request) with a 200.
        if let Some(fault) = parsed.error {
            return Err(GeocodingError::Payload(format!(
                "service error {}: {}",
                fault.code.unwrap_or_default(),
                fault.message.unwrap_or_default()
            )));
        }

        let points = localities(parsed.candidates);
        if points.is_empty() {
            warn!(place, "no locality among geocoding candidates");
            return Err(GeocodingError::NotFound { place: place.to_string() });
        }

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder(server: &MockServer) -> ArcGisGeocoder {
        ArcGisGeocoder::new(None, Client::new()).with_base_url(server.uri())
    }

    fn candidate(address: &str, x: f64, y: f64, addr_type: &str) -> serde_json::Value {
        json!({
            "address": address,
            "location": {"x": x, "y": y},
            "score": 100,
            "attributes": {"Addr_type": addr_type}
        })
    }

    #[tokio::test]
    async fn keeps_distinct_localities_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/findAddressCandidates"))
            .and(query_param("SingleLine", "Odesa"))
            .and(query_param("maxLocations", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spatialReference": {"wkid": 4326},
                "candidates": [
                    candidate("Odesa, Odeska Oblast, UKR", 30.7326, 46.4843, "Locality"),
                    candidate("Odesa Street, Kyiv, UKR", 30.5, 50.4, "StreetName"),
                    candidate("Odesa, UKR", 30.7326, 46.4843, "Locality"),
                    candidate("Odessa, Texas, USA", -102.3677, 31.8457, "Locality"),
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let points = geocoder(&server).candidates("Odesa").await.unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].address, "Odesa, Odeska Oblast, UKR");
        assert_eq!(points[0].location, LocationKey::new("46.4843", "30.7326"));
        assert_eq!(points[1].location, LocationKey::new("31.8457", "-102.3677"));
    }

    #[tokio::test]
    async fn resolve_returns_the_only_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [candidate("Chornomorske, UKR", 32.69, 45.5, "Locality")]
            })))
            .mount(&server)
            .await;

        let location = geocoder(&server).resolve("Chornomorske").await.unwrap();
        assert_eq!(location, LocationKey::new("45.5", "32.69"));
    }

    #[tokio::test]
    async fn resolve_rejects_several_matches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    candidate("Odesa, UKR", 30.73, 46.48, "Locality"),
                    candidate("Odessa, USA", -102.36, 31.84, "Locality"),
                ]
            })))
            .mount(&server)
            .await;

        let err = geocoder(&server).resolve("Odesa").await.unwrap_err();
        match err {
            GeocodingError::Ambiguous { place, candidates } => {
                assert_eq!(place, "Odesa");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_locality_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [candidate("Some Street", 1.0, 2.0, "StreetName")]
            })))
            .mount(&server)
            .await;

        let err = geocoder(&server).candidates("Some Street").await.unwrap_err();
        assert!(matches!(err, GeocodingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn service_fault_is_a_payload_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": 498, "message": "Invalid Token", "details": []}
            })))
            .mount(&server)
            .await;

        let err = geocoder(&server).candidates("Odesa").await.unwrap_err();
        assert!(err.to_string().contains("Invalid Token"));
    }

    #[tokio::test]
    async fn http_error_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = geocoder(&server).candidates("Odesa").await.unwrap_err();
        assert!(matches!(err, GeocodingError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }
}
