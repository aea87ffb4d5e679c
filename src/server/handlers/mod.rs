pub mod chat;
pub mod config;
pub mod guardrail;
pub mod health;
pub mod limits;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;

const ALLOWED_ROLES: [&str; 3] = ["user", "assistant", "system"];

/// `{ "messages": [{ "role": ..., "content": ... }, ...] }`
#[derive(Debug, Deserialize)]
pub struct MessagesBody {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl MessagesBody {
    /// Unwraps the extractor result and checks every message. The length cap
    /// applies to user messages only; earlier assistant answers may be long.
    /// Problems are collected so the client sees all of them at once.
    pub fn validate(
        body: Result<Json<MessagesBody>, JsonRejection>,
        max_input_length: usize,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let Json(body) =
            body.map_err(|rejection| ApiError::Validation(vec![rejection.body_text()]))?;

        let mut details = Vec::new();
        if body.messages.is_empty() {
            details.push("messages: must contain at least one message".to_string());
        }

        for (index, message) in body.messages.iter().enumerate() {
            if !ALLOWED_ROLES.contains(&message.role.as_str()) {
                details.push(format!(
                    "messages[{}].role: must be one of {}",
                    index,
                    ALLOWED_ROLES.join(", ")
                ));
            }
            if message.content.trim().is_empty() {
                details.push(format!("messages[{}].content: must not be empty", index));
            } else if message.role == "user" && message.content.chars().count() > max_input_length {
                details.push(format!(
                    "messages[{}].content: must be at most {} characters",
                    index, max_input_length
                ));
            }
        }

        if details.is_empty() {
            Ok(body.messages)
        } else {
            Err(ApiError::Validation(details))
        }
    }
}
