use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use super::{limits, MessagesBody};
use crate::core::errors::ApiError;
use crate::guardrail::GuardrailDecision;
use crate::state::AppState;

/// Screens the last message of the conversation.
pub async fn check(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<MessagesBody>, JsonRejection>,
) -> Response {
    let outcome = match limits::admit(&state.rate_limiter, &headers).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    let response = match evaluate(&state, body).await {
        Ok(decision) => Json(decision).into_response(),
        Err(err) => err.into_response(),
    };
    limits::with_headers(response, &outcome)
}

async fn evaluate(
    state: &AppState,
    body: Result<Json<MessagesBody>, JsonRejection>,
) -> Result<GuardrailDecision, ApiError> {
    let max_input_length = state.settings.app.max_input_length;
    let messages = MessagesBody::validate(body, max_input_length)?;
    let query = messages
        .last()
        .map(|m| m.content.as_str())
        .ok_or_else(|| {
            ApiError::Validation(vec![
                "messages: must contain at least one message".to_string(),
            ])
        })?;
    if query.chars().count() > max_input_length {
        return Err(ApiError::Validation(vec![format!(
            "messages: last message must be at most {} characters",
            max_input_length
        )]));
    }

    state.guardrail.evaluate(query).await
}
