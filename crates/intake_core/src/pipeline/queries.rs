//! crates/intake_core/src/pipeline/queries.rs
//!
//! Generates supplier-oriented search queries for one application.

use std::sync::Arc;

use tracing::error;

use crate::ports::StructuredGenerationService;
use crate::schema::StringListSchema;

pub const QUERIES_SCHEMA: StringListSchema =
    StringListSchema::array("a search-engine query string");

pub fn query_prompt(application: &str) -> String {
    format!(
        r#"You are a B2B technical sales researcher.

APPLICATION: {application}

TASK:
Generate at least 20 highly effective search phrases to find companies, manufacturers, OEMs or research labs involved in this application. Focus on the material, the process and the functional role.

GUIDELINES:
- Include modifiers like "supplier", "manufacturer", "OEM", "compounder".
- Only return phrases that would work well in a web or maps search."#
    )
}

pub struct QueryGenerator {
    model: Arc<dyn StructuredGenerationService>,
}

impl QueryGenerator {
    pub fn new(model: Arc<dyn StructuredGenerationService>) -> Self {
        Self { model }
    }

    /// Never fails: a generation error yields no queries for this application.
    pub async fn generate(&self, application: &str) -> Vec<String> {
        match self
            .model
            .generate_list(&query_prompt(application), &QUERIES_SCHEMA)
            .await
        {
            Ok(queries) => queries,
            Err(e) => {
                error!("Search term error for '{}': {}", application, e);
                Vec::new()
            }
        }
    }
}
