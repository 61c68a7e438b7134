use reqwest::Client;
use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::turn::{TurnReply, TurnRequest, TurnTaker};

/// A chat service that already speaks the turn protocol:
/// `POST {base}/api/chat` with `{transcript, currentSkill}`, answering
/// `{content, rating?}`.
#[derive(Clone)]
pub struct EndpointClient {
    client: Client,
    base_url: String,
}

impl EndpointClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TurnTaker for EndpointClient {
    async fn take_turn(&self, request: &TurnRequest) -> Result<TurnReply> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self.client
            .post(&url)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chat endpoint error {}: {}", status, text));
        }

        let reply: TurnReply = response.json().await?;
        Ok(reply)
    }
}
