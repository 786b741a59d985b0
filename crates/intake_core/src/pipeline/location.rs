//! crates/intake_core/src/pipeline/location.rs
//!
//! Best-effort guess of where the respondent is based, used to bias searches.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::domain::{GeoPoint, QaPair};
use crate::ports::GeocodingService;

pub const LOCATION_KEYWORDS: [&str; 7] = [
    "location", "city", "region", "area", "place", "from", "based in",
];

/// Per keyword: a capitalized phrase following it, optionally after "in".
static KEYWORD_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    LOCATION_KEYWORDS
        .iter()
        .map(|keyword| {
            let pattern = format!(r"{}\s+(in\s+)?([A-Z][a-zA-Z\s]+)", regex::escape(keyword));
            (*keyword, Regex::new(&pattern).expect("location pattern is valid"))
        })
        .collect()
});

/// Scans pairs latest first and returns the first captured location phrase.
pub fn extract_location(pairs: &[QaPair]) -> Option<String> {
    for pair in pairs.iter().rev() {
        let question = pair.question.to_lowercase();
        let answer = pair.answer.to_lowercase();

        for (keyword, pattern) in KEYWORD_PATTERNS.iter() {
            if !question.contains(keyword) && !answer.contains(keyword) {
                continue;
            }
            if let Some(found) = pattern.captures(&pair.answer).and_then(|c| c.get(2)) {
                let location = found.as_str().trim();
                if !location.is_empty() {
                    return Some(location.to_string());
                }
            }
        }
    }
    None
}

pub struct LocationResolver {
    geocoder: Arc<dyn GeocodingService>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn GeocodingService>) -> Self {
        Self { geocoder }
    }

    /// Never fails: anything short of a geocoded hit means an unbiased search.
    pub async fn resolve(&self, pairs: &[QaPair]) -> Option<GeoPoint> {
        let location = extract_location(pairs)?;

        match self.geocoder.geocode(&location).await {
            Ok(Some(point)) => {
                info!(
                    "User location: {} -> ({}, {})",
                    location, point.latitude, point.longitude
                );
                Some(point)
            }
            Ok(None) => {
                info!("Location '{}' could not be geocoded", location);
                None
            }
            Err(e) => {
                warn!("Error in geocoding location '{}': {}", location, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGeocoder;

    fn pair(question: &str, answer: &str) -> QaPair {
        QaPair {
            question: question.into(),
            answer: answer.into(),
        }
    }

    mod extraction {
        use super::*;

        #[test]
        fn captures_phrase_after_based_in() {
            let pairs = vec![pair("Where are you?", "We are based in Houston")];
            assert_eq!(extract_location(&pairs).as_deref(), Some("Houston"));
        }

        #[test]
        fn keyword_in_question_allows_capture_from_answer() {
            let pairs = vec![pair(
                "Which region do you supply?",
                "Mostly we ship from Rotterdam Netherlands",
            )];
            assert_eq!(
                extract_location(&pairs).as_deref(),
                Some("Rotterdam Netherlands")
            );
        }

        #[test]
        fn optional_in_is_skipped() {
            let pairs = vec![pair("What is your location?", "location in Pune")];
            assert_eq!(extract_location(&pairs).as_deref(), Some("Pune"));
        }

        #[test]
        fn prefers_latest_pair() {
            let pairs = vec![
                pair("Where?", "We are based in Lyon"),
                pair("Anything else?", "Our new plant is based in Monterrey"),
            ];
            assert_eq!(extract_location(&pairs).as_deref(), Some("Monterrey"));
        }

        #[test]
        fn lowercase_phrase_is_not_captured() {
            let pairs = vec![pair("Which city are you in?", "the city of nowhere")];
            assert_eq!(extract_location(&pairs), None);
        }

        #[test]
        fn no_keyword_no_location() {
            let pairs = vec![pair("What is the MOQ?", "One tonne, shipped by Maersk")];
            assert_eq!(extract_location(&pairs), None);
        }
    }

    mod resolution {
        use super::*;

        #[tokio::test]
        async fn geocodes_extracted_location() {
            let point = GeoPoint {
                latitude: 29.76,
                longitude: -95.37,
            };
            let geocoder = MockGeocoder::new().with_location("Houston", point);
            let resolver = LocationResolver::new(Arc::new(geocoder.clone()));

            let pairs = vec![pair("Where?", "We are based in Houston")];
            assert_eq!(resolver.resolve(&pairs).await, Some(point));
            assert_eq!(geocoder.lookups(), vec!["Houston"]);
        }

        #[tokio::test]
        async fn geocoder_failure_degrades_to_none() {
            let geocoder = MockGeocoder::new().failing();
            let resolver = LocationResolver::new(Arc::new(geocoder));
            let pairs = vec![pair("Where?", "We are based in Houston")];
            assert_eq!(resolver.resolve(&pairs).await, None);
        }

        #[tokio::test]
        async fn nothing_to_geocode_skips_lookup() {
            let geocoder = MockGeocoder::new();
            let resolver = LocationResolver::new(Arc::new(geocoder.clone()));
            assert_eq!(resolver.resolve(&[pair("Q", "A")]).await, None);
            assert!(geocoder.lookups().is_empty());
        }
    }
}
