//! crates/intake_core/src/pipeline/sink.rs

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{ApplicationRecord, Company, SearchQueryEntry};
use crate::ports::{PortResult, ResultStore};

/// Writes one document per application, replacing whatever an earlier run stored.
pub struct ResultSink {
    store: Arc<dyn ResultStore>,
}

impl ResultSink {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    pub async fn write(&self, entry: &SearchQueryEntry) -> PortResult<()> {
        self.store.upsert_application(to_record(entry)).await
    }
}

pub fn to_record(entry: &SearchQueryEntry) -> ApplicationRecord {
    ApplicationRecord {
        application: entry.application.clone(),
        search_terms: entry.queries.clone(),
        companies: entry
            .places
            .iter()
            .filter(|place| !place.is_permanently_closed())
            .map(Company::from)
            .collect(),
        status: entry.status,
        updated_at: Utc::now(),
    }
}
