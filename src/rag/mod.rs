//! Knowledge-base retrieval.
//!
//! This module provides:
//! - `VectorSearch` / `QdrantSearch`: nearest-neighbour search over the collection
//! - `Reranker` / `CohereReranker`: second-pass relevance scoring
//! - `RetrievalAgent`: embed, search, split by type, re-rank and merge

pub mod agent;
pub mod documents;
pub mod qdrant;
pub mod reranker;
pub mod store;

pub use agent::RetrievalAgent;
pub use documents::{DocumentMetadata, DocumentType, RetrievedDocument};
pub use qdrant::QdrantSearch;
pub use reranker::{CohereReranker, RerankHit, Reranker};
pub use store::{VectorCandidate, VectorSearch};
