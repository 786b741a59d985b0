//! services/api/src/adapters/geocoding.rs
//!
//! Adapter for the Google Geocoding API, implementing the `GeocodingService` port.

use async_trait::async_trait;
use intake_core::{
    domain::GeoPoint,
    ports::{GeocodingService, PortError, PortResult},
};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::request_error;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Clone)]
pub struct GoogleGeocodingAdapter {
    http: Client,
    api_key: String,
}

impl GoogleGeocodingAdapter {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GeocodeResponse {
    /// The first result when the lookup succeeded.
    fn first_point(self) -> Option<GeoPoint> {
        if self.status != "OK" {
            return None;
        }
        self.results.into_iter().next().map(|r| GeoPoint {
            latitude: r.geometry.location.lat,
            longitude: r.geometry.location.lng,
        })
    }
}

#[async_trait]
impl GeocodingService for GoogleGeocodingAdapter {
    async fn geocode(&self, location: &str) -> PortResult<Option<GeoPoint>> {
        let response = self
            .http
            .get(GEOCODE_URL)
            .query(&[("address", location), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(request_error)?;

        let parsed: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| PortError::InvalidResponse(format!("Failed to parse geocode response: {}", e)))?;

        debug!("Geocoding '{}' returned status {}", location, parsed.status);
        Ok(parsed.first_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_status_yields_first_location() {
        let raw = r#"{"status": "OK", "results": [
            {"geometry": {"location": {"lat": 29.76, "lng": -95.37}}},
            {"geometry": {"location": {"lat": 1.0, "lng": 2.0}}}
        ]}"#;
        let parsed: GeocodeResponse = serde_json::from_str(raw).unwrap();
        let point = parsed.first_point().unwrap();
        assert_eq!(point.latitude, 29.76);
        assert_eq!(point.longitude, -95.37);
    }

    #[test]
    fn zero_results_is_none() {
        let parsed: GeocodeResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert!(parsed.first_point().is_none());
    }
}
