//! VectorSearch trait — abstract interface over the knowledge-base index.
//!
//! The collection is populated by a separate ingestion path; at request
//! time it is read-only. The primary implementation is `QdrantSearch`.

use async_trait::async_trait;

use super::documents::DocumentMetadata;
use crate::core::errors::ApiError;

/// A nearest-neighbour hit with its payload. Lives for one retrieval only.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorCandidate {
    pub id: String,
    /// Vector similarity (higher = better).
    pub score: f32,
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Unfiltered search returning at most `limit` candidates ordered by
    /// descending similarity.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorCandidate>, ApiError>;
}
