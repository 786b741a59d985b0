//! crates/intake_core/src/pipeline/mod.rs
//!
//! The post-conversation pipeline: transcript -> applications -> search queries
//! -> places -> stored company lists.

pub mod extractor;
pub mod location;
pub mod places;
pub mod queries;
pub mod sink;

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use crate::domain::{qa_pairs, GeoPoint, SearchQueryEntry, Turn};
use crate::ports::{
    GeocodingService, PlacesSearchService, PortResult, ResultStore, StructuredGenerationService,
};

pub use extractor::ApplicationExtractor;
pub use location::LocationResolver;
pub use places::{PlacesSearcher, SearchConfig};
pub use queries::QueryGenerator;
pub use sink::ResultSink;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub search: SearchConfig,
    /// Applications processed at the same time.
    pub application_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            application_concurrency: 4,
        }
    }
}

/// Everything one run produced, in extraction order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub applications: Vec<String>,
    pub entries: Vec<SearchQueryEntry>,
}

pub struct SearchPipeline {
    extractor: ApplicationExtractor,
    queries: QueryGenerator,
    location: LocationResolver,
    searcher: PlacesSearcher,
    sink: ResultSink,
    application_concurrency: usize,
}

impl SearchPipeline {
    pub fn new(
        model: Arc<dyn StructuredGenerationService>,
        places: Arc<dyn PlacesSearchService>,
        geocoder: Arc<dyn GeocodingService>,
        results: Arc<dyn ResultStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor: ApplicationExtractor::new(model.clone()),
            queries: QueryGenerator::new(model),
            location: LocationResolver::new(geocoder),
            searcher: PlacesSearcher::new(places, config.search),
            sink: ResultSink::new(results),
            application_concurrency: config.application_concurrency.max(1),
        }
    }

    /// Runs the whole pipeline over a finished transcript.
    ///
    /// Only a failed extraction is an error. Each stored application is
    /// independent, so a failed write leaves the others in place.
    pub async fn run(&self, turns: &[Turn]) -> PortResult<PipelineReport> {
        let pairs = qa_pairs(turns);
        if pairs.is_empty() {
            info!("No answered questions in transcript; nothing to search.");
            return Ok(PipelineReport::default());
        }

        let bias = self.location.resolve(&pairs).await;

        let extracted = self.extractor.extract(&pairs).await?;
        let applications = unique_applications(extracted);
        info!("Extracted {} applications", applications.len());

        let processing: Vec<_> = applications
            .iter()
            .map(|application| self.process_application(application, bias))
            .collect();
        let entries: Vec<SearchQueryEntry> = stream::iter(processing)
            .buffered(self.application_concurrency)
            .collect()
            .await;

        Ok(PipelineReport {
            applications,
            entries,
        })
    }

    async fn process_application(&self, application: &str, bias: Option<GeoPoint>) -> SearchQueryEntry {
        let queries = self.queries.generate(application).await;
        let entry = self
            .searcher
            .search_application(application, queries, bias)
            .await;

        info!(
            "Application '{}': {} queries, {} companies, status {}",
            application,
            entry.queries.len(),
            entry.places.len(),
            entry.status.as_str()
        );

        if let Err(e) = self.sink.write(&entry).await {
            error!("Failed to store results for '{}': {}", application, e);
        }
        entry
    }
}

/// Drops blank entries and exact duplicates, keeping first occurrences in order.
pub fn unique_applications(applications: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    applications
        .into_iter()
        .filter(|app| !app.trim().is_empty())
        .filter(|app| seen.insert(app.clone()))
        .collect()
}
