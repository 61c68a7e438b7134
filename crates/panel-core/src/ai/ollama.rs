use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result, anyhow};

use super::prompt;
use crate::turn::{TurnReply, TurnRequest};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Single-shot `/api/generate` call constrained to JSON output
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct Tags {
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run one evaluation turn. The whole transcript is flattened into a
    /// completion prompt since `/api/generate` has no message list.
    pub async fn evaluate(&self, model: &str, request: &TurnRequest) -> Result<TurnReply> {
        let body = GenerateRequest {
            model,
            prompt: prompt::render_prompt(request),
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("reaching Ollama at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Ollama evaluation with {} failed ({}). Is `ollama serve` running and the model pulled?",
                model,
                status
            ));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .context("parsing Ollama generate response")?;
        prompt::parse_turn_reply(&generated.response)
    }

    /// Names of the locally pulled models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .with_context(|| format!("reaching Ollama at {}", self.base_url))?;

        if !response.status().is_success() {
            return Err(anyhow!("Ollama model listing failed ({})", response.status()));
        }

        let tags: Tags = response.json().await.context("parsing Ollama model list")?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
