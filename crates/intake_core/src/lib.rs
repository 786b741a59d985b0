pub mod domain;
pub mod engine;
pub mod intake;
pub mod memory;
pub mod mock;
pub mod pipeline;
pub mod policy;
pub mod ports;
pub mod schema;

pub use domain::{
    ApplicationRecord, ChatMessage, Company, GeoPoint, Place, QaPair, Role, SearchQueryEntry,
    SearchStatus, Session, SessionStatus, Turn,
};
pub use engine::{ConversationEngine, EngineConfig, NextStep};
pub use intake::{IntakeService, TurnOutcome};
pub use pipeline::{PipelineConfig, PipelineReport, SearchPipeline};
pub use policy::QuestionPolicy;
pub use ports::{
    ChatModelService, GeocodingService, PlacesSearchService, PortError, PortResult, ResultStore,
    StructuredGenerationService, TranscriptStore,
};
pub use schema::StringListSchema;
