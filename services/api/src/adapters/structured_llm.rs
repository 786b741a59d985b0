//! services/api/src/adapters/structured_llm.rs
//!
//! This module contains the adapter for the extraction LLM, used by the search
//! pipeline for both application extraction and query generation.
//! It implements the `StructuredGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use intake_core::{
    ports::{PortError, PortResult, StructuredGenerationService},
    schema::StringListSchema,
};
use tracing::debug;

#[derive(Clone)]
pub struct OpenAiStructuredAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiStructuredAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl StructuredGenerationService for OpenAiStructuredAdapter {
    async fn generate_list(&self, prompt: &str, schema: &StringListSchema) -> PortResult<Vec<String>> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(schema.instructions())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt.to_string())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let raw = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                PortError::InvalidResponse("Structured completion contained no text content.".to_string())
            })?;

        debug!("Structured completion: {}", raw);
        schema.decode(&raw)
    }
}
