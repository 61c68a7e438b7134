//! The boundary between the evaluation engine and whatever chat service
//! produces the assistant's side of each turn.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::state::ChatMessage;

/// What the chat service is told on every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    /// Session generation the request was issued under
    #[serde(skip)]
    pub generation: u64,
    /// Position of `current_skill` in the skill queue
    #[serde(skip)]
    pub skill_index: usize,
    pub transcript: Vec<ChatMessage>,
    pub current_skill: String,
}

/// The chat service's answer. A present `rating` resolves the current skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReply {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl TurnReply {
    pub fn continuation(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rating: None,
        }
    }

    pub fn rated(content: impl Into<String>, rating: f64) -> Self {
        Self {
            content: content.into(),
            rating: Some(rating),
        }
    }
}

/// Anything that can take the assistant's side of an evaluation turn.
#[async_trait]
pub trait TurnTaker: Send + Sync {
    async fn take_turn(&self, request: &TurnRequest) -> Result<TurnReply>;
}

/// Run one turn against `taker`, giving up after `deadline`.
///
/// Dropping the pending future on expiry cancels the in-flight request.
pub async fn run_turn<T>(taker: &T, request: &TurnRequest, deadline: Duration) -> Result<TurnReply>
where
    T: TurnTaker + ?Sized,
{
    match tokio::time::timeout(deadline, taker.take_turn(request)).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "chat service did not answer within {} seconds",
            deadline.as_secs_f32()
        )),
    }
}
