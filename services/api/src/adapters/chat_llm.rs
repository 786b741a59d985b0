//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the interviewing LLM.
//! It implements the `ChatModelService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use intake_core::{
    domain::{ChatMessage, Role},
    ports::{ChatModelService, PortError, PortResult},
};

/// Upper bound on the length of a generated question.
const MAX_QUESTION_TOKENS: u32 = 150;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatModelService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn to_request_message(message: &ChatMessage) -> PortResult<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let built = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::System),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::User),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::Assistant),
    };
    built.map_err(|e| PortError::Unexpected(e.to_string()))
}

//=========================================================================================
// `ChatModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatModelService for OpenAiChatAdapter {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> PortResult<String> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<PortResult<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(MAX_QUESTION_TOKENS)
            .temperature(temperature)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::InvalidResponse("Chat completion contained no text content.".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}
