use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Resolves a free-text address to a coordinate pair. Injected into the
/// pipeline so tests can substitute a stub for the network call.
#[async_trait]
pub trait Geocode: Send + Sync {
    /// First candidate's coordinates, or `None` when the provider
    /// returns no candidates or any error occurs. The caller owns the
    /// inter-call throttle.
    async fn geocode(&self, address: &str) -> Option<(f64, f64)>;
}

/// Google Maps Geocoding API client.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    async fn lookup(&self, address: &str) -> crate::error::Result<GeocodeResponse> {
        let response = self
            .client
            .get(GEOCODE_ENDPOINT)
            .query(&[("address", address), ("key", &self.api_key)])
            .send()
            .await?
            .error_for_status()?
            .json::<GeocodeResponse>()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl Geocode for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Option<(f64, f64)> {
        match self.lookup(address).await {
            Ok(response) => {
                let location = response
                    .results
                    .into_iter()
                    .next()
                    .map(|candidate| candidate.geometry.location);
                match location {
                    Some(location) => {
                        debug!("Geocoded '{}' -> ({}, {})", address, location.lat, location.lng);
                        Some((location.lat, location.lng))
                    }
                    None => {
                        warn!("No geocoding candidates for '{}' (status {})", address, response.status);
                        None
                    }
                }
            }
            Err(e) => {
                warn!("Geocoding failed for '{}': {}", address, e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_shape_deserializes() {
        let body = r#"{
            "status": "OK",
            "results": [
                {"geometry": {"location": {"lat": -22.9673, "lng": -43.1815}}},
                {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
            ]
        }"#;
        let response: GeocodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, "OK");
        let first = &response.results[0].geometry.location;
        assert_eq!((first.lat, first.lng), (-22.9673, -43.1815));
    }

    #[test]
    fn zero_results_deserializes_empty() {
        let body = r#"{"status": "ZERO_RESULTS", "results": []}"#;
        let response: GeocodeResponse = serde_json::from_str(body).unwrap();
        assert!(response.results.is_empty());
    }
}
