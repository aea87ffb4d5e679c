use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{ChatRequest, ClassificationVerdict};
use crate::core::errors::ApiError;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;

    /// chat completion (streaming); the receiver closes when the answer ends
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError>;
}

#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    /// structured completion parsed into a verdict
    async fn classify(
        &self,
        system_prompt: &str,
        query: &str,
    ) -> Result<ClassificationVerdict, ApiError>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// length every returned vector must have
    fn dimensions(&self) -> usize;

    /// one vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed(&[input.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| ApiError::upstream("embedding provider returned no vectors"))?;
        if vector.len() != self.dimensions() {
            return Err(ApiError::Upstream(format!(
                "embedding has {} dimensions, expected {}",
                vector.len(),
                self.dimensions()
            )));
        }
        Ok(vector)
    }
}
