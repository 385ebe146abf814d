//! OpenAI-compatible payloads for the bridge's two response shapes.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::response::sse::Event;
use uuid::Uuid;

use crate::error::BridgeError;
use crate::protocol::{
    AssistantMessage, ChatCompletion, ChatCompletionChunk, ChunkChoice, CompletionChoice, Delta,
};

/// SSE sentinel that terminates a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A fresh completion id. Every chunk gets its own.
fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

pub fn delta_chunk(model: &str, content: String) -> ChatCompletionChunk {
    chunk(
        model,
        Delta {
            content: Some(content),
        },
        None,
    )
}

pub fn finish_chunk(model: &str) -> ChatCompletionChunk {
    chunk(model, Delta::default(), Some("stop"))
}

fn chunk(model: &str, delta: Delta, finish_reason: Option<&'static str>) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: completion_id(),
        object: "chat.completion.chunk",
        created: unix_now(),
        model: model.to_string(),
        choices: vec![ChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }],
    }
}

pub fn completion(model: &str, content: String) -> ChatCompletion {
    ChatCompletion {
        id: completion_id(),
        object: "chat.completion",
        created: unix_now(),
        model: model.to_string(),
        choices: vec![CompletionChoice {
            index: 0,
            message: AssistantMessage {
                role: "assistant",
                content,
            },
            finish_reason: "stop",
        }],
    }
}

pub fn chunk_event(chunk: &ChatCompletionChunk) -> Event {
    let data = serde_json::to_string(chunk).unwrap_or_default();
    Event::default().data(data)
}

pub fn error_event(err: &BridgeError) -> Event {
    Event::default().data(err.payload().to_string())
}

pub fn done_event() -> Event {
    Event::default().data(DONE_SENTINEL)
}
