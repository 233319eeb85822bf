//! HTTP client for an Open-Elevation compatible lookup service.
//!
//! Request: `GET {url}?locations=lat,lng|lat,lng|...`
//! Response: `{"results": [{"latitude": .., "longitude": .., "elevation": ..}, ...]}`

use reqwest::blocking::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::config::AppConfig;
use crate::fresnel::ElevationProfile;
use crate::geodesy::LatLng;

/// Error type for elevation lookups.
#[derive(Debug, Clone, PartialEq)]
pub enum ElevationError {
    Network(String),
    Status(u16),
    Malformed(String),
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for ElevationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElevationError::Network(msg) => write!(f, "Network error: {}", msg),
            ElevationError::Status(code) => write!(f, "Elevation service returned HTTP {}", code),
            ElevationError::Malformed(msg) => write!(f, "Malformed elevation response: {}", msg),
            ElevationError::LengthMismatch { expected, actual } => {
                write!(f, "Elevation service returned {} values for {} locations", actual, expected)
            }
        }
    }
}

impl std::error::Error for ElevationError {}

/// Source of ground heights for a list of coordinates.
pub trait ElevationProvider {
    /// One elevation in meters per input point, in the same order.
    fn lookup(&self, points: &[LatLng]) -> Result<Vec<f64>, ElevationError>;
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Deserialize)]
struct LookupResult {
    #[serde(default)]
    elevation: Option<f64>,
}

/// `lat,lng|lat,lng|...` as expected by the `locations` query parameter.
pub fn encode_locations(points: &[LatLng]) -> String {
    points.iter().map(|p| format!("{},{}", p.lat, p.lng)).collect::<Vec<_>>().join("|")
}

/// Decode a lookup response body. Missing or null elevations read as 0.
pub fn parse_lookup_response(body: &str, expected: usize) -> Result<Vec<f64>, ElevationError> {
    let response: LookupResponse = serde_json::from_str(body).map_err(|e| ElevationError::Malformed(e.to_string()))?;
    let elevations: Vec<f64> = response.results.iter().map(|r| r.elevation.unwrap_or(0.0)).collect();
    if elevations.len() != expected {
        return Err(ElevationError::LengthMismatch {
            expected,
            actual: elevations.len(),
        });
    }
    Ok(elevations)
}

/// Blocking client for the public Open-Elevation API or a self-hosted instance.
pub struct OpenElevationClient {
    client: Client,
    url: String,
}

impl OpenElevationClient {
    pub fn new(config: &AppConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            url: config.elevation_api_url.clone(),
        })
    }
}

impl ElevationProvider for OpenElevationClient {
    fn lookup(&self, points: &[LatLng]) -> Result<Vec<f64>, ElevationError> {
        log::debug!("Requesting {} elevations from {}", points.len(), self.url);

        let response = self
            .client
            .get(&self.url)
            .query(&[("locations", encode_locations(points))])
            .send()
            .map_err(|e| ElevationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ElevationError::Status(status.as_u16()));
        }
        let body = response.text().map_err(|e| ElevationError::Network(e.to_string()))?;
        parse_lookup_response(&body, points.len())
    }
}

/// Stand-in used when the HTTP client could not be built; every lookup fails
/// with the build error so zones fall back to zero elevation.
pub struct UnavailableProvider {
    pub reason: String,
}

impl ElevationProvider for UnavailableProvider {
    fn lookup(&self, _points: &[LatLng]) -> Result<Vec<f64>, ElevationError> {
        Err(ElevationError::Network(self.reason.clone()))
    }
}

/// Look up the profile for `samples`, degrading to all zeros on any failure.
pub fn fetch_profile(provider: &dyn ElevationProvider, samples: &[LatLng]) -> ElevationProfile {
    match provider.lookup(samples) {
        Ok(elevations) if elevations.len() == samples.len() => ElevationProfile::from_provider(elevations),
        Ok(elevations) => {
            log::warn!(
                "Elevation lookup failed: {}, using zero elevation",
                ElevationError::LengthMismatch {
                    expected: samples.len(),
                    actual: elevations.len(),
                }
            );
            ElevationProfile::zeros(samples.len())
        }
        Err(e) => {
            log::warn!("Elevation lookup failed: {}, using zero elevation", e);
            ElevationProfile::zeros(samples.len())
        }
    }
}
