//! services/api/src/adapters/sheet_llm.rs
//!
//! This module contains the adapter for the sheet-generating LLM.
//! It implements the `CompletionService` port from the `core` crate against any
//! OpenAI-compatible chat completion endpoint (OpenAI itself, or Gemini's
//! OpenAI-compatible endpoint).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use fiche_core::ports::{CompletionPrompt, CompletionService, PortError, PortResult};
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletionAdapter {
    /// Creates a new `OpenAiCompletionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Maps a provider failure onto the port error, keeping the provider's own message.
fn map_openai_error(e: OpenAIError) -> PortError {
    match e {
        OpenAIError::ApiError(api) => PortError::Unavailable(api.message),
        other => PortError::Unavailable(other.to_string()),
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiCompletionAdapter {
    /// Sends the instruction and prompt, constraining the answer to the prompt's JSON schema.
    async fn complete(&self, prompt: &CompletionPrompt) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system_instruction.clone())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user_prompt.clone())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: prompt.schema_name.to_string(),
                schema: Some(prompt.response_schema.clone()),
                strict: None,
            },
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(response_format)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!("Requesting a sheet from model {}", self.model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        // An empty body is a valid port answer; the core decides what it means.
        match response.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content.unwrap_or_default()),
            None => {
                warn!("Completion returned no choices.");
                Ok(String::new())
            }
        }
    }
}
