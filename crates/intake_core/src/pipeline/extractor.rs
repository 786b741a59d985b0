//! crates/intake_core/src/pipeline/extractor.rs
//!
//! Turns a finished transcript into granular product applications.

use std::sync::Arc;

use crate::domain::QaPair;
use crate::ports::{PortResult, StructuredGenerationService};
use crate::schema::StringListSchema;

pub const APPLICATIONS_SCHEMA: StringListSchema = StringListSchema::object(
    "predicted_interests",
    "the list of granular, product-level applications",
);

const EXTRACTION_PROMPT: &str = r#"You are given a conversation about a product. Extract ONLY extremely specific, product-level, real-world applications of the product discussed.

STRICT GUIDELINES:
- Include only granular, concrete use-cases: specific physical products or engineered processes where the product plays a direct, technical role.
- Do NOT name any industry (e.g. automotive, medical, packaging).
- Do NOT include vague functional benefits (e.g. "improves strength", "enhances adhesion", "boosts resistance", "improves performance").
- Every entry must state the exact application, the target component or material, and the functional role of the product.

VALID EXAMPLES:
- "adhesion promoter in polypropylene/glass fiber composite bumpers for injection molding"
- "compatibilizer in recycled polyethylene/polypropylene multilayer film extrusion"
- "coupling agent for polypropylene/hemp fiber biocomposites used in outdoor decking tiles"
- "reactive modifier in polypropylene-based filaments for fused deposition modeling (FDM) 3D printing"

INSTRUCTIONS:
- Include applications where the product is used as an intermediary or in combination with other products.
- Include both established and plausible, unexplored applications.
- Return at least 20 unique applications, as many as possible, without padding the list with generic, business or industry terms.

CONVERSATION:"#;

/// Renders question/answer pairs as one role-tagged line per message.
pub fn to_chat_transcript(pairs: &[QaPair]) -> String {
    pairs
        .iter()
        .flat_map(|pair| {
            [
                format!("<|assistant|> {}", pair.question),
                format!("<|user|> {}", pair.answer),
            ]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn extraction_prompt(pairs: &[QaPair]) -> String {
    format!("{}\n{}", EXTRACTION_PROMPT, to_chat_transcript(pairs))
}

pub struct ApplicationExtractor {
    model: Arc<dyn StructuredGenerationService>,
}

impl ApplicationExtractor {
    pub fn new(model: Arc<dyn StructuredGenerationService>) -> Self {
        Self { model }
    }

    /// Returns the model's list as-is; count and uniqueness are not enforced here.
    pub async fn extract(&self, pairs: &[QaPair]) -> PortResult<Vec<String>> {
        self.model
            .generate_list(&extraction_prompt(pairs), &APPLICATIONS_SCHEMA)
            .await
    }
}
