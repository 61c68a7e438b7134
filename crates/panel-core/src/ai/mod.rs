pub mod claude;
pub mod endpoint;
pub mod ollama;
pub mod openai;
pub mod prompt;

pub use claude::ClaudeClient;
pub use endpoint::EndpointClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use anyhow::Result;
use async_trait::async_trait;

use crate::turn::{TurnReply, TurnRequest, TurnTaker};

/// An LLM client that evaluates through a particular model
#[derive(Clone)]
pub enum LlmBackend {
    Ollama(OllamaClient),
    Claude(ClaudeClient),
    OpenAI(OpenAIClient),
}

#[derive(Clone)]
pub struct ProviderTurnTaker {
    backend: LlmBackend,
    model: String,
}

impl ProviderTurnTaker {
    pub fn new(backend: LlmBackend, model: &str) -> Self {
        Self {
            backend,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TurnTaker for ProviderTurnTaker {
    async fn take_turn(&self, request: &TurnRequest) -> Result<TurnReply> {
        match &self.backend {
            LlmBackend::Ollama(client) => client.evaluate(&self.model, request).await,
            LlmBackend::Claude(client) => client.evaluate(&self.model, request).await,
            LlmBackend::OpenAI(client) => client.evaluate(&self.model, request).await,
        }
    }
}
