use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use super::prompt;
use crate::turn::{TurnReply, TurnRequest};

const CLAUDE_API_URL: &str = "https://api.anthropic.com";

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    text: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: CLAUDE_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn evaluate(&self, model: &str, request: &TurnRequest) -> Result<TurnReply> {
        // The Messages API wants the conversation to open with a user turn
        let messages = prompt::with_user_first(&request.transcript)
            .into_iter()
            .map(|m| ClaudeMessage {
                role: m.role.as_str().to_string(),
                content: m.content,
            })
            .collect();

        let body = ClaudeRequest {
            model: model.to_string(),
            max_tokens: 1024,
            system: prompt::system_prompt(request),
            messages,
        };

        let response = self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Claude API error {}: {}", status, text));
        }

        let claude_response: ClaudeResponse = response.json().await?;
        let text = claude_response.content.first()
            .map(|c| c.text.clone())
            .unwrap_or_default();
        prompt::parse_turn_reply(&text)
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
        ]
    }
}
