//! Instructions for LLM-backed evaluators and parsing of what they send back.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::state::{ChatMessage, ChatRole};
use crate::turn::{TurnReply, TurnRequest};

/// System instructions for the skill currently under discussion.
pub fn system_prompt(request: &TurnRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are interviewing a subject-matter expert to gauge their expertise, ");
    prompt.push_str("one skill at a time. Ask short, concrete follow-up questions about real ");
    prompt.push_str("projects, depth and duration of experience.\n\n");

    prompt.push_str(&format!("The skill under discussion is: {}\n\n", request.current_skill));

    prompt.push_str("Answer ONLY with a JSON object of the form ");
    prompt.push_str(r#"{"content": "<your message to the candidate>", "rating": <number>}"#);
    prompt.push_str(".\nInclude \"rating\" (1 = novice, 10 = world-class) only once you have ");
    prompt.push_str("heard enough to rate this skill; leave it out to keep asking about it.");

    prompt
}

/// Flatten the instructions and transcript into a single completion prompt.
pub fn render_prompt(request: &TurnRequest) -> String {
    let mut prompt = system_prompt(request);
    prompt.push_str("\n\nConversation so far:\n");
    for msg in &request.transcript {
        match msg.role {
            ChatRole::User => prompt.push_str(&format!("Candidate: {}\n", msg.content)),
            ChatRole::Assistant => prompt.push_str(&format!("Interviewer: {}\n", msg.content)),
        }
    }
    prompt.push_str("\nRespond with the JSON object now.");
    prompt
}

/// Chat APIs that insist on a user turn first get a short kickoff message.
pub fn with_user_first(transcript: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    if transcript.first().map(|m| m.role) == Some(ChatRole::Assistant) {
        messages.push(ChatMessage::user("I'm ready for the evaluation."));
    }
    messages.extend_from_slice(transcript);
    messages
}

#[derive(Deserialize)]
struct RawReply {
    content: String,
    #[serde(default)]
    rating: Option<Value>,
}

/// First `{...}` in `raw` that deserializes as an evaluation object.
fn find_reply_object(raw: &str) -> Option<RawReply> {
    raw.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&raw[start..])
            .into_iter::<RawReply>()
            .next()
            .and_then(|parsed| parsed.ok())
    })
}

/// Turn a model's raw answer into a [`TurnReply`].
///
/// Models wrap JSON in prose or code fences often enough that every `{` is
/// tried as the start of the object. Text with no JSON at all is taken as a
/// plain follow-up question.
pub fn parse_turn_reply(raw: &str) -> Result<TurnReply> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("model returned an empty reply"));
    }

    let Some(parsed) = find_reply_object(raw) else {
        if raw.contains("\"content\"") {
            return Err(anyhow!("model reply is not a valid evaluation object: {}", raw));
        }
        return Ok(TurnReply::continuation(raw));
    };

    let rating = match parsed.rating {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => Some(
            s.trim()
                .parse::<f64>()
                .map_err(|_| anyhow!("model returned a non-numeric rating: {}", s))?,
        ),
        Some(other) => return Err(anyhow!("model returned a non-numeric rating: {}", other)),
    };

    Ok(TurnReply {
        content: parsed.content,
        rating,
    })
}
