use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{limits, MessagesBody};
use crate::core::errors::ApiError;
use crate::state::AppState;

const CHUNK_BUFFER: usize = 32;

/// Streams a grounded answer to the conversation as plain text.
///
/// Generation runs in its own task. The handler waits for the first chunk so
/// failures before any text exists still produce a proper error response;
/// after that the status is fixed and a failure ends the body early.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<MessagesBody>, JsonRejection>,
) -> Response {
    let outcome = match limits::admit(&state.rate_limiter, &headers).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    let response = match start(&state, body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    limits::with_headers(response, &outcome)
}

async fn start(
    state: &AppState,
    body: Result<Json<MessagesBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let messages = MessagesBody::validate(body, state.settings.app.max_input_length)?;
    if !messages.iter().any(|m| m.role == "user") {
        return Err(ApiError::Validation(vec![
            "messages: must contain a user message".to_string(),
        ]));
    }

    let (tx, mut rx) = mpsc::channel(CHUNK_BUFFER);
    let agent = state.chat.clone();
    tokio::spawn(async move {
        if let Err(err) = agent.run(messages, &tx).await {
            let _ = tx.send(Err(err)).await;
        }
    });

    let first = match rx.recv().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(err)) => return Err(err),
        None => None,
    };

    let chunks = stream::unfold((first, rx, false), |(pending, mut rx, done)| async move {
        if done {
            return None;
        }
        if let Some(chunk) = pending {
            return Some((Ok(chunk), (None, rx, false)));
        }
        match rx.recv().await? {
            Ok(chunk) => Some((Ok(chunk), (None, rx, false))),
            Err(err) => {
                tracing::error!("Chat stream aborted: {}", err);
                Some((Err(err), (None, rx, true)))
            }
        }
    });

    let mut response = Body::from_stream(chunks).into_response();
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}
