//! Qdrant vector store adapter (REST API).
//!
//! Points carry the uploaded document as payload: a `content` string plus
//! the `documentType`-tagged metadata fields.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::documents::DocumentMetadata;
use super::store::{VectorCandidate, VectorSearch};
use crate::core::errors::ApiError;

const API_KEY_HEADER: &str = "api-key";

#[derive(Clone)]
pub struct QdrantSearch {
    base_url: String,
    api_key: Option<String>,
    collection: String,
    client: Client,
}

impl QdrantSearch {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        collection: String,
        client: Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            collection,
            client,
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

#[async_trait]
impl VectorSearch for QdrantSearch {
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorCandidate>, ApiError> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        let body = json!({
            "vector": query_embedding,
            "limit": limit,
            "with_payload": true,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.header(API_KEY_HEADER, key);
        }

        let res = request.send().await.map_err(ApiError::upstream)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "vector search failed ({}): {}",
                status, text
            )));
        }

        let response: SearchResponse = res.json().await.map_err(ApiError::upstream)?;
        let candidates = response
            .result
            .into_iter()
            .take(limit)
            .filter_map(into_candidate)
            .collect();

        Ok(candidates)
    }
}

fn into_candidate(point: ScoredPoint) -> Option<VectorCandidate> {
    let id = match &point.id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let payload = point.payload?;

    let content = payload
        .get("content")
        .or_else(|| payload.get("text"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    match serde_json::from_value::<DocumentMetadata>(payload) {
        Ok(metadata) => Some(VectorCandidate {
            id,
            score: point.score,
            content,
            metadata,
        }),
        Err(err) => {
            tracing::debug!("Skipping point {} with unusable payload: {}", id, err);
            None
        }
    }
}
