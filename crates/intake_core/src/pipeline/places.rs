//! crates/intake_core/src/pipeline/places.rs
//!
//! Runs search queries against the places collaborator and folds the results
//! for one application into a deduplicated, status-tagged entry.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{error, warn};

use crate::domain::{BoundingBox, GeoPoint, Place, PlacesQuery, SearchQueryEntry, SearchStatus};
use crate::ports::PlacesSearchService;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Pages fetched per query, including the first.
    pub max_pages: usize,
    pub page_size: u32,
    /// Pause before following a continuation token.
    pub page_delay: Duration,
    /// Half the side of the search rectangle around a location bias, in degrees.
    pub bias_half_width: f64,
    /// Queries of one application searched at the same time.
    pub query_concurrency: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_pages: 3,
            page_size: 20,
            page_delay: Duration::from_secs(2),
            bias_half_width: 0.5,
            query_concurrency: 4,
        }
    }
}

/// Places gathered for a single query and how the query went.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub places: Vec<Place>,
    pub status: SearchStatus,
}

impl QueryOutcome {
    /// What this query contributes to its application's status.
    fn contribution(&self) -> SearchStatus {
        match self.status {
            SearchStatus::Ok if self.places.is_empty() => SearchStatus::ZeroResults,
            status => status,
        }
    }
}

pub struct PlacesSearcher {
    places: Arc<dyn PlacesSearchService>,
    config: SearchConfig,
}

impl PlacesSearcher {
    pub fn new(places: Arc<dyn PlacesSearchService>, config: SearchConfig) -> Self {
        Self { places, config }
    }

    /// Runs one query across up to `max_pages` pages.
    ///
    /// A failure part-way keeps the places already received and reports `Error`.
    pub async fn search(&self, query: &str, bias: Option<GeoPoint>) -> QueryOutcome {
        let mut request = PlacesQuery {
            text: query.to_string(),
            restriction: bias.map(|point| BoundingBox::around(point, self.config.bias_half_width)),
            page_token: None,
            page_size: self.config.page_size,
        };

        let mut places = Vec::new();
        for page_number in 0..self.config.max_pages {
            let page = match self.places.search_text(&request).await {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        "Places search failed | Query: '{}' | Page: {} | Error: {}",
                        query,
                        page_number + 1,
                        e
                    );
                    return QueryOutcome {
                        places,
                        status: SearchStatus::Error,
                    };
                }
            };
            places.extend(page.places);

            let Some(token) = page.next_page_token else {
                break;
            };
            if page_number + 1 == self.config.max_pages {
                break;
            }
            if !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
            request.page_token = Some(token);
        }

        QueryOutcome {
            places,
            status: SearchStatus::Ok,
        }
    }

    /// Searches every query of an application and merges the results.
    pub async fn search_application(
        &self,
        application: &str,
        queries: Vec<String>,
        bias: Option<GeoPoint>,
    ) -> SearchQueryEntry {
        // `buffered` keeps query order, so "first occurrence wins" stays deterministic.
        let searches: Vec<_> = queries.iter().map(|query| self.search(query, bias)).collect();
        let outcomes: Vec<QueryOutcome> = stream::iter(searches)
            .buffered(self.config.query_concurrency.max(1))
            .collect()
            .await;

        let status = aggregate_status(&outcomes);
        let failed = outcomes
            .iter()
            .filter(|o| o.status == SearchStatus::Error)
            .count();
        if failed > 0 {
            warn!(
                "{} of {} searches for '{}' failed; status {}",
                failed,
                outcomes.len(),
                application,
                status.as_str()
            );
        }

        SearchQueryEntry {
            application: application.to_string(),
            queries,
            places: merge_places(outcomes.into_iter().flat_map(|o| o.places)),
            status,
        }
    }
}

/// The highest status any query produced, starting from `ZeroResults`.
///
/// `Ok` (a query succeeded with places) outranks `Error`, which outranks
/// `ZeroResults`, regardless of the order queries finished in.
pub fn aggregate_status(outcomes: &[QueryOutcome]) -> SearchStatus {
    outcomes
        .iter()
        .map(QueryOutcome::contribution)
        .fold(SearchStatus::ZeroResults, SearchStatus::max)
}

/// Drops permanently closed places and places without an id, then keeps the
/// first record seen for each id.
pub fn merge_places(places: impl IntoIterator<Item = Place>) -> Vec<Place> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(|place| !place.is_permanently_closed())
        .filter(|place| match &place.id {
            Some(id) => seen.insert(id.clone()),
            None => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PERMANENTLY_CLOSED;
    use crate::mock::{place, MockError, MockPlacesService};

    fn searcher(places: MockPlacesService) -> PlacesSearcher {
        PlacesSearcher::new(
            Arc::new(places),
            SearchConfig {
                page_delay: Duration::ZERO,
                ..SearchConfig::default()
            },
        )
    }

    fn closed(id: &str) -> Place {
        Place {
            business_status: Some(PERMANENTLY_CLOSED.to_string()),
            ..place(id, "Closed Co")
        }
    }

    mod pagination {
        use super::*;

        #[tokio::test]
        async fn follows_tokens_up_to_three_pages() {
            let mock = MockPlacesService::new()
                .with_page("q", vec![place("1", "A")])
                .with_page("q", vec![place("2", "B")])
                .with_page("q", vec![place("3", "C")])
                .with_page("q", vec![place("4", "D")]);
            let outcome = searcher(mock.clone()).search("q", None).await;

            assert_eq!(outcome.status, SearchStatus::Ok);
            assert_eq!(outcome.places.len(), 3);
            let requests = mock.requests();
            assert_eq!(requests.len(), 3);
            assert_eq!(requests[0].page_token, None);
            assert!(requests[1].page_token.is_some());
            assert_eq!(requests[0].page_size, 20);
        }

        #[tokio::test]
        async fn stops_without_token() {
            let mock = MockPlacesService::new().with_page("q", vec![place("1", "A")]);
            searcher(mock.clone()).search("q", None).await;
            assert_eq!(mock.requests().len(), 1);
        }

        #[tokio::test]
        async fn failure_keeps_earlier_pages() {
            let mock = MockPlacesService::new()
                .with_page("q", vec![place("1", "A")])
                .with_error("q", MockError::Unavailable("503".into()));
            let outcome = searcher(mock).search("q", None).await;
            assert_eq!(outcome.status, SearchStatus::Error);
            assert_eq!(outcome.places.len(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn sleeps_between_pages() {
            let mock = MockPlacesService::new()
                .with_page("q", vec![place("1", "A")])
                .with_page("q", vec![place("2", "B")]);
            let searcher = PlacesSearcher::new(Arc::new(mock), SearchConfig::default());

            let started = tokio::time::Instant::now();
            searcher.search("q", None).await;
            assert!(started.elapsed() >= Duration::from_secs(2));
        }

        #[tokio::test]
        async fn bias_becomes_rectangle_restriction() {
            let mock = MockPlacesService::new();
            let center = GeoPoint {
                latitude: 10.0,
                longitude: 20.0,
            };
            searcher(mock.clone()).search("q", Some(center)).await;

            let restriction = mock.requests()[0].restriction.unwrap();
            assert_eq!(restriction.min_latitude, 9.5);
            assert_eq!(restriction.max_longitude, 20.5);
            assert_eq!(restriction, BoundingBox::around(center, 0.5));
        }
    }

    mod status {
        use super::*;

        fn outcome(status: SearchStatus, count: usize) -> QueryOutcome {
            QueryOutcome {
                places: (0..count).map(|i| place(&i.to_string(), "P")).collect(),
                status,
            }
        }

        #[test]
        fn no_queries_is_zero_results() {
            assert_eq!(aggregate_status(&[]), SearchStatus::ZeroResults);
        }

        #[test]
        fn ok_without_places_is_zero_results() {
            assert_eq!(
                aggregate_status(&[outcome(SearchStatus::Ok, 0)]),
                SearchStatus::ZeroResults
            );
        }

        #[test]
        fn error_outranks_zero_results() {
            assert_eq!(
                aggregate_status(&[outcome(SearchStatus::Ok, 0), outcome(SearchStatus::Error, 0)]),
                SearchStatus::Error
            );
        }

        #[test]
        fn ok_survives_later_error() {
            assert_eq!(
                aggregate_status(&[outcome(SearchStatus::Ok, 2), outcome(SearchStatus::Error, 0)]),
                SearchStatus::Ok
            );
        }

        #[test]
        fn ok_wins_over_earlier_error() {
            assert_eq!(
                aggregate_status(&[outcome(SearchStatus::Error, 0), outcome(SearchStatus::Ok, 1)]),
                SearchStatus::Ok
            );
        }
    }

    mod merging {
        use super::*;

        #[tokio::test]
        async fn overlapping_queries_keep_first_record_per_id() {
            let mock = MockPlacesService::new()
                .with_page("q1", vec![place("a", "First A"), place("b", "B")])
                .with_page("q2", vec![place("a", "Second A"), place("c", "C")]);
            let entry = searcher(mock)
                .search_application("app", vec!["q1".into(), "q2".into()], None)
                .await;

            let ids: Vec<&str> = entry.places.iter().filter_map(|p| p.id.as_deref()).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
            assert_eq!(entry.places[0].name.as_deref(), Some("First A"));
            assert_eq!(entry.status, SearchStatus::Ok);
            assert_eq!(entry.queries, vec!["q1", "q2"]);
        }

        #[tokio::test]
        async fn permanently_closed_places_are_dropped() {
            let mock = MockPlacesService::new()
                .with_page("q", vec![closed("x"), place("y", "Open")]);
            let entry = searcher(mock)
                .search_application("app", vec!["q".into()], None)
                .await;
            assert_eq!(entry.places.len(), 1);
            assert_eq!(entry.places[0].id.as_deref(), Some("y"));
        }

        #[tokio::test]
        async fn empty_pages_yield_zero_results() {
            let mock = MockPlacesService::new()
                .with_page("q", vec![])
                .with_page("q", vec![]);
            let entry = searcher(mock)
                .search_application("app", vec!["q".into(), "other".into()], None)
                .await;
            assert_eq!(entry.status, SearchStatus::ZeroResults);
            assert!(entry.places.is_empty());
        }

        #[tokio::test]
        async fn mid_pagination_failure_keeps_received_places() {
            let mock = MockPlacesService::new()
                .with_page("q", vec![place("1", "A")])
                .with_error("q", MockError::Unavailable("quota".into()));
            let entry = searcher(mock)
                .search_application("app", vec!["q".into()], None)
                .await;
            assert_eq!(entry.status, SearchStatus::Error);
            assert_eq!(entry.places.len(), 1);
        }

        #[test]
        fn places_without_id_are_dropped() {
            let anonymous = Place {
                id: None,
                ..place("ignored", "Anon")
            };
            assert!(merge_places(vec![anonymous]).is_empty());
        }
    }
}
