//! services/api/src/adapters/places.rs
//!
//! This module contains the adapter for the Google Places (New) text search API.
//! It implements the `PlacesSearchService` port from the `core` crate.

use async_trait::async_trait;
use intake_core::{
    domain::{BoundingBox, GeoPoint, Place, PlacesPage, PlacesQuery},
    ports::{PlacesSearchService, PortError, PortResult},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::request_error;

const SEARCH_TEXT_URL: &str = "https://places.googleapis.com/v1/places:searchText";

/// Fields requested for every place.
const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.location,\
places.primaryType,places.types,places.businessStatus,places.googleMapsUri,places.websiteUri,\
places.nationalPhoneNumber,places.internationalPhoneNumber,places.rating,places.userRatingCount,\
nextPageToken";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct GooglePlacesAdapter {
    http: Client,
    api_key: String,
}

impl GooglePlacesAdapter {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchTextRequest<'a> {
    text_query: &'a str,
    max_result_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_restriction: Option<LocationRestriction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Serialize)]
struct LocationRestriction {
    rectangle: Rectangle,
}

#[derive(Serialize)]
struct Rectangle {
    low: LatLng,
    high: LatLng,
}

#[derive(Serialize, Deserialize, Clone, Copy)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<BoundingBox> for LocationRestriction {
    fn from(b: BoundingBox) -> Self {
        Self {
            rectangle: Rectangle {
                low: LatLng {
                    latitude: b.min_latitude,
                    longitude: b.min_longitude,
                },
                high: LatLng {
                    latitude: b.max_latitude,
                    longitude: b.max_longitude,
                },
            },
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SearchTextResponse {
    #[serde(default)]
    places: Vec<WirePlace>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct DisplayName {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePlace {
    id: Option<String>,
    display_name: Option<DisplayName>,
    formatted_address: Option<String>,
    location: Option<LatLng>,
    primary_type: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    business_status: Option<String>,
    google_maps_uri: Option<String>,
    website_uri: Option<String>,
    national_phone_number: Option<String>,
    international_phone_number: Option<String>,
    rating: Option<f64>,
    user_rating_count: Option<u32>,
}

impl From<WirePlace> for Place {
    fn from(p: WirePlace) -> Self {
        Place {
            id: p.id,
            name: p.display_name.map(|n| n.text),
            address: p.formatted_address,
            location: p.location.map(|l| GeoPoint {
                latitude: l.latitude,
                longitude: l.longitude,
            }),
            primary_type: p.primary_type,
            types: p.types,
            business_status: p.business_status,
            maps_url: p.google_maps_uri,
            website: p.website_uri,
            national_phone: p.national_phone_number,
            international_phone: p.international_phone_number,
            rating: p.rating,
            rating_count: p.user_rating_count,
        }
    }
}

//=========================================================================================
// `PlacesSearchService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlacesSearchService for GooglePlacesAdapter {
    async fn search_text(&self, query: &PlacesQuery) -> PortResult<PlacesPage> {
        let body = SearchTextRequest {
            text_query: &query.text,
            max_result_count: query.page_size,
            location_restriction: query.restriction.map(LocationRestriction::from),
            page_token: query.page_token.as_deref(),
        };

        let response = self
            .http
            .post(SEARCH_TEXT_URL)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Places search failed with status {}: {}",
                status, error_body
            )));
        }

        let parsed: SearchTextResponse = response
            .json()
            .await
            .map_err(|e| PortError::InvalidResponse(format!("Failed to parse places response: {}", e)))?;

        Ok(PlacesPage {
            places: parsed.places.into_iter().map(Place::from).collect(),
            next_page_token: parsed.next_page_token.filter(|t| !t.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_maps_to_domain_places() {
        let raw = r#"{
            "places": [{
                "id": "abc",
                "displayName": {"text": "Poly Compounds", "languageCode": "en"},
                "formattedAddress": "1 Main St, Houston, TX",
                "location": {"latitude": 29.7, "longitude": -95.3},
                "types": ["manufacturer"],
                "businessStatus": "OPERATIONAL",
                "googleMapsUri": "https://maps.google.com/?cid=1",
                "userRatingCount": 12
            }],
            "nextPageToken": "next"
        }"#;
        let parsed: SearchTextResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.next_page_token.as_deref(), Some("next"));

        let place = Place::from(parsed.places.into_iter().next().unwrap());
        assert_eq!(place.id.as_deref(), Some("abc"));
        assert_eq!(place.name.as_deref(), Some("Poly Compounds"));
        assert_eq!(place.location.map(|l| l.latitude), Some(29.7));
        assert_eq!(place.rating_count, Some(12));
        assert!(place.website.is_none());
        assert!(!place.is_permanently_closed());
    }

    #[test]
    fn empty_response_has_no_places() {
        let parsed: SearchTextResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.places.is_empty());
        assert!(parsed.next_page_token.is_none());
    }

    #[test]
    fn request_serializes_restriction_as_rectangle() {
        let restriction = BoundingBox::around(
            GeoPoint {
                latitude: 10.0,
                longitude: 20.0,
            },
            0.5,
        );
        let body = SearchTextRequest {
            text_query: "compounder",
            max_result_count: 20,
            location_restriction: Some(restriction.into()),
            page_token: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["textQuery"], "compounder");
        assert_eq!(value["maxResultCount"], 20);
        assert_eq!(value["locationRestriction"]["rectangle"]["low"]["latitude"], 9.5);
        assert_eq!(value["locationRestriction"]["rectangle"]["high"]["longitude"], 20.5);
        assert!(value.get("pageToken").is_none());
    }
}
