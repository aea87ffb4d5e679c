//! Retrieval and re-ranking agent.
//!
//! 1. Embed the query
//! 2. One unfiltered vector search for a fixed candidate pool
//! 3. Split the pool by document type, truncating each bucket in search order
//! 4. Re-rank each bucket independently with its own output cap
//! 5. Concatenate: case studies, then white-paper chunks
//!
//! Any provider failure yields an empty result so generation can still run
//! with a "nothing found" framing.

use std::sync::Arc;

use super::documents::{DocumentMetadata, DocumentType, RetrievedDocument};
use super::reranker::Reranker;
use super::store::{VectorCandidate, VectorSearch};
use crate::core::config::settings::RetrievalSettings;
use crate::core::errors::ApiError;
use crate::llm::EmbeddingProvider;

pub struct RetrievalAgent {
    embeddings: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorSearch>,
    reranker: Arc<dyn Reranker>,
    settings: RetrievalSettings,
}

/// Search results split by kind, each still in vector-similarity order.
#[derive(Debug, Default)]
struct CandidateBuckets {
    case_studies: Vec<VectorCandidate>,
    white_paper_chunks: Vec<VectorCandidate>,
}

impl RetrievalAgent {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorSearch>,
        reranker: Arc<dyn Reranker>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embeddings,
            vectors,
            reranker,
            settings,
        }
    }

    pub async fn retrieve(&self, query: &str) -> Vec<RetrievedDocument> {
        match self.try_retrieve(query).await {
            Ok(documents) => {
                tracing::info!(
                    query_len = query.len(),
                    documents = documents.len(),
                    "Knowledge base retrieval finished"
                );
                documents
            }
            Err(err) => {
                tracing::warn!(
                    "Knowledge base retrieval failed, continuing without documents: {}",
                    err
                );
                Vec::new()
            }
        }
    }

    async fn try_retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, ApiError> {
        let embedding = self.embeddings.embed_one(query).await?;
        let candidates = self
            .vectors
            .search(&embedding, self.settings.total_candidates)
            .await?;
        tracing::debug!("Vector search returned {} candidates", candidates.len());

        let buckets = partition_candidates(
            candidates,
            self.settings.case_study_limit,
            self.settings.white_paper_limit,
        );

        let (case_studies, white_paper_chunks) = tokio::try_join!(
            self.rerank_bucket(
                query,
                DocumentType::CaseStudy,
                buckets.case_studies,
                self.settings.case_study_rerank_top,
            ),
            self.rerank_bucket(
                query,
                DocumentType::WhitePaperChunk,
                buckets.white_paper_chunks,
                self.settings.white_paper_rerank_top,
            ),
        )?;

        let mut documents = case_studies;
        documents.extend(white_paper_chunks);
        Ok(documents)
    }

    async fn rerank_bucket(
        &self,
        query: &str,
        kind: DocumentType,
        bucket: Vec<VectorCandidate>,
        top_n: usize,
    ) -> Result<Vec<RetrievedDocument>, ApiError> {
        if bucket.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = bucket.iter().map(|c| c.content.clone()).collect();
        let hits = self.reranker.rerank(query, &texts, top_n).await?;

        let mut slots: Vec<Option<VectorCandidate>> = bucket.into_iter().map(Some).collect();
        let mut documents = Vec::with_capacity(top_n);
        for hit in hits {
            if documents.len() >= top_n {
                break;
            }
            let Some(candidate) = slots.get_mut(hit.index).and_then(Option::take) else {
                tracing::debug!(
                    "Ignoring rerank index {} for {} bucket",
                    hit.index,
                    kind.as_str()
                );
                continue;
            };
            documents.push(RetrievedDocument {
                content: candidate.content,
                relevance_score: hit.relevance_score,
                metadata: candidate.metadata,
            });
        }

        Ok(documents)
    }
}

fn partition_candidates(
    candidates: Vec<VectorCandidate>,
    case_study_limit: usize,
    white_paper_limit: usize,
) -> CandidateBuckets {
    let mut buckets = CandidateBuckets::default();
    for candidate in candidates {
        match candidate.metadata {
            DocumentMetadata::CaseStudy(_) => {
                if buckets.case_studies.len() < case_study_limit {
                    buckets.case_studies.push(candidate);
                }
            }
            DocumentMetadata::WhitePaperChunk(_) => {
                if buckets.white_paper_chunks.len() < white_paper_limit {
                    buckets.white_paper_chunks.push(candidate);
                }
            }
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::documents::{CaseStudyMetadata, WhitePaperChunkMetadata};
    use crate::rag::reranker::RerankHit;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedEmbeddings {
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbeddings {
        fn dimensions(&self) -> usize {
            2
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            if self.fail {
                return Err(ApiError::upstream("embedding down"));
            }
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct FixedSearch {
        candidates: Vec<VectorCandidate>,
        requested_limit: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl VectorSearch for FixedSearch {
        async fn search(
            &self,
            _query_embedding: &[f32],
            limit: usize,
        ) -> Result<Vec<VectorCandidate>, ApiError> {
            *self.requested_limit.lock().expect("lock") = Some(limit);
            Ok(self.candidates.iter().take(limit).cloned().collect())
        }
    }

    /// Scores documents in reverse submission order and records what it saw.
    #[derive(Default)]
    struct RecordingReranker {
        fail_on_bucket_containing: Option<&'static str>,
        calls: Mutex<Vec<(Vec<String>, usize)>>,
        extra_out_of_range_hit: bool,
    }

    #[async_trait]
    impl Reranker for RecordingReranker {
        async fn rerank(
            &self,
            _query: &str,
            documents: &[String],
            top_n: usize,
        ) -> Result<Vec<RerankHit>, ApiError> {
            self.calls
                .lock()
                .expect("lock")
                .push((documents.to_vec(), top_n));
            if let Some(marker) = self.fail_on_bucket_containing {
                if documents.iter().any(|d| d.contains(marker)) {
                    return Err(ApiError::upstream("rerank down"));
                }
            }
            let mut hits = Vec::new();
            if self.extra_out_of_range_hit {
                hits.push(RerankHit {
                    index: documents.len() + 10,
                    relevance_score: 0.99,
                });
            }
            hits.extend((0..documents.len()).rev().map(|index| RerankHit {
                index,
                relevance_score: 0.9 - index as f32 * 0.01,
            }));
            Ok(hits)
        }
    }

    fn case_study(id: usize) -> VectorCandidate {
        VectorCandidate {
            id: format!("cs-{}", id),
            score: 1.0 - id as f32 * 0.01,
            content: format!("case study {}", id),
            metadata: DocumentMetadata::CaseStudy(CaseStudyMetadata {
                client_name: format!("Client {}", id),
                ..Default::default()
            }),
        }
    }

    fn white_paper(id: usize) -> VectorCandidate {
        VectorCandidate {
            id: format!("wp-{}", id),
            score: 1.0 - id as f32 * 0.01,
            content: format!("white paper {}", id),
            metadata: DocumentMetadata::WhitePaperChunk(WhitePaperChunkMetadata {
                section_title: format!("Section {}", id),
                ..Default::default()
            }),
        }
    }

    fn agent_with(
        candidates: Vec<VectorCandidate>,
        reranker: Arc<RecordingReranker>,
        settings: RetrievalSettings,
    ) -> RetrievalAgent {
        RetrievalAgent::new(
            Arc::new(FixedEmbeddings { fail: false }),
            Arc::new(FixedSearch {
                candidates,
                requested_limit: Mutex::new(None),
            }),
            reranker,
            settings,
        )
    }

    #[tokio::test]
    async fn mixed_pool_yields_capped_buckets_case_studies_first() {
        let mut candidates = Vec::new();
        for i in 0..10 {
            candidates.push(white_paper(i));
            if i < 4 {
                candidates.push(case_study(i));
            }
        }
        let reranker = Arc::new(RecordingReranker::default());
        let agent = agent_with(candidates, reranker.clone(), RetrievalSettings::default());

        let docs = agent.retrieve("Our radiology practice has a 40% denial rate").await;

        let case_count = docs
            .iter()
            .filter(|d| matches!(d.metadata, DocumentMetadata::CaseStudy(_)))
            .count();
        assert_eq!(case_count, 1);
        assert_eq!(docs.len(), 6);
        assert!(matches!(docs[0].metadata, DocumentMetadata::CaseStudy(_)));
        assert!(docs[1..]
            .iter()
            .all(|d| matches!(d.metadata, DocumentMetadata::WhitePaperChunk(_))));
        // Highest-scoring hit is the last submitted document of each bucket.
        assert_eq!(docs[0].content, "case study 3");
        assert_eq!(docs[1].content, "white paper 9");
    }

    #[tokio::test]
    async fn truncation_keeps_vector_order_per_bucket() {
        let candidates: Vec<VectorCandidate> = (0..6)
            .map(case_study)
            .chain((0..12).map(white_paper))
            .collect();
        let reranker = Arc::new(RecordingReranker::default());
        let settings = RetrievalSettings {
            total_candidates: 20,
            ..RetrievalSettings::default()
        };
        let agent = agent_with(candidates, reranker.clone(), settings);

        agent.retrieve("denials").await;

        let calls = reranker.calls.lock().expect("lock").clone();
        assert_eq!(calls.len(), 2);
        let case_call = calls
            .iter()
            .find(|(docs, _)| docs[0].starts_with("case"))
            .expect("case study bucket reranked");
        assert_eq!(
            case_call.0,
            vec!["case study 0", "case study 1", "case study 2", "case study 3"]
        );
        assert_eq!(case_call.1, 1);
        let paper_call = calls
            .iter()
            .find(|(docs, _)| docs[0].starts_with("white"))
            .expect("white paper bucket reranked");
        let expected: Vec<String> = (0..10).map(|i| format!("white paper {}", i)).collect();
        assert_eq!(paper_call.0, expected);
        assert_eq!(paper_call.1, 5);
    }

    #[tokio::test]
    async fn search_requests_configured_pool_size() {
        let search = Arc::new(FixedSearch {
            candidates: vec![case_study(0)],
            requested_limit: Mutex::new(None),
        });
        let agent = RetrievalAgent::new(
            Arc::new(FixedEmbeddings { fail: false }),
            search.clone(),
            Arc::new(RecordingReranker::default()),
            RetrievalSettings {
                total_candidates: 15,
                ..RetrievalSettings::default()
            },
        );

        agent.retrieve("denials").await;
        assert_eq!(*search.requested_limit.lock().expect("lock"), Some(15));
    }

    #[tokio::test]
    async fn rerank_failure_in_either_bucket_returns_empty() {
        let candidates = vec![case_study(0), white_paper(0), white_paper(1)];
        let reranker = Arc::new(RecordingReranker {
            fail_on_bucket_containing: Some("white paper"),
            ..Default::default()
        });
        let agent = agent_with(candidates, reranker, RetrievalSettings::default());

        assert!(agent.retrieve("denials").await.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_returns_empty() {
        let agent = RetrievalAgent::new(
            Arc::new(FixedEmbeddings { fail: true }),
            Arc::new(FixedSearch {
                candidates: vec![case_study(0)],
                requested_limit: Mutex::new(None),
            }),
            Arc::new(RecordingReranker::default()),
            RetrievalSettings::default(),
        );

        assert!(agent.retrieve("denials").await.is_empty());
    }

    #[tokio::test]
    async fn empty_bucket_is_not_reranked() {
        let reranker = Arc::new(RecordingReranker::default());
        let agent = agent_with(
            vec![white_paper(0), white_paper(1)],
            reranker.clone(),
            RetrievalSettings::default(),
        );

        let docs = agent.retrieve("denials").await;

        assert_eq!(docs.len(), 2);
        assert_eq!(reranker.calls.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_indices_are_dropped() {
        let reranker = Arc::new(RecordingReranker {
            extra_out_of_range_hit: true,
            ..Default::default()
        });
        let agent = agent_with(
            vec![case_study(0), case_study(1)],
            reranker,
            RetrievalSettings::default(),
        );

        let docs = agent.retrieve("denials").await;

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "case study 1");
    }

    #[test]
    fn partition_respects_each_limit_independently() {
        let candidates = vec![
            white_paper(0),
            case_study(0),
            white_paper(1),
            case_study(1),
            white_paper(2),
        ];
        let buckets = partition_candidates(candidates, 1, 2);
        let case_ids: Vec<&str> = buckets.case_studies.iter().map(|c| c.id.as_str()).collect();
        let paper_ids: Vec<&str> = buckets
            .white_paper_chunks
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(case_ids, vec!["cs-0"]);
        assert_eq!(paper_ids, vec!["wp-0", "wp-1"]);
    }
}
