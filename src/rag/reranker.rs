use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;

/// One re-ranked item: position in the submitted list plus its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankHit {
    pub index: usize,
    pub relevance_score: f32,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Returns at most `top_n` hits in descending relevance order.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, ApiError>;
}

/// Cohere-compatible `/rerank` endpoint.
#[derive(Clone)]
pub struct CohereReranker {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl CohereReranker {
    pub fn new(base_url: String, api_key: Option<String>, model: String, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            client,
        }
    }
}

#[derive(Deserialize)]
struct RerankResponse {
    #[serde(default)]
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, ApiError> {
        if documents.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.base_url);
        let body = json!({
            "model": self.model,
            "query": query,
            "documents": documents,
            "top_n": top_n.min(documents.len()),
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(ApiError::upstream)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "rerank failed ({}): {}",
                status, text
            )));
        }

        let response: RerankResponse = res.json().await.map_err(ApiError::upstream)?;
        let mut hits: Vec<RerankHit> = response
            .results
            .into_iter()
            .map(|r| RerankHit {
                index: r.index,
                relevance_score: r.relevance_score,
            })
            .collect();
        hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        hits.truncate(top_n);

        Ok(hits)
    }
}
