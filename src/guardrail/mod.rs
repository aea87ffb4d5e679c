//! Two-stage admission check run before retrieval and generation.
//!
//! Stage 1 asks a classification model whether the query is on topic and
//! normalises its wording. Stage 2 embeds the refined query next to a fixed
//! domain description and rejects anything below a similarity threshold.
//! Ambiguous or low-confidence results are rejected, never passed through.

pub mod prompt;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;

use crate::core::config::settings::GuardrailSettings;
use crate::core::errors::ApiError;
use crate::llm::{ClassificationProvider, EmbeddingProvider};
use crate::vector_math::cosine_similarity;

use prompt::{CLASSIFICATION_FALLBACK, CLASSIFIER_SYSTEM_PROMPT, SIMILARITY_CLARIFICATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionStage {
    LlmClassification,
    EmbeddingSimilarity,
}

impl RejectionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionStage::LlmClassification => "llm_classification",
            RejectionStage::EmbeddingSimilarity => "embedding_similarity",
        }
    }
}

/// Either accepted, or rejected with both a stage and a clarification.
/// Only constructible through [`GuardrailDecision::accept`] and
/// [`GuardrailDecision::reject`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailDecision {
    accepted: bool,
    query: String,
    confidence: Option<u8>,
    similarity_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clarification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected_by: Option<RejectionStage>,
}

impl GuardrailDecision {
    pub fn accept(query: String, confidence: Option<u8>, similarity_score: f32) -> Self {
        Self {
            accepted: true,
            query,
            confidence,
            similarity_score: Some(similarity_score),
            clarification: None,
            rejected_by: None,
        }
    }

    pub fn reject(
        stage: RejectionStage,
        query: String,
        confidence: Option<u8>,
        similarity_score: Option<f32>,
        clarification: String,
    ) -> Self {
        Self {
            accepted: false,
            query,
            confidence,
            similarity_score,
            clarification: Some(clarification),
            rejected_by: Some(stage),
        }
    }

    pub fn accepted(&self) -> bool {
        self.accepted
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn confidence(&self) -> Option<u8> {
        self.confidence
    }

    pub fn similarity_score(&self) -> Option<f32> {
        self.similarity_score
    }

    pub fn clarification(&self) -> Option<&str> {
        self.clarification.as_deref()
    }

    pub fn rejected_by(&self) -> Option<RejectionStage> {
        self.rejected_by
    }
}

pub struct Guardrail {
    classifier: Arc<dyn ClassificationProvider>,
    embeddings: Arc<dyn EmbeddingProvider>,
    settings: GuardrailSettings,
    domain_embedding: OnceCell<Vec<f32>>,
}

impl Guardrail {
    pub fn new(
        classifier: Arc<dyn ClassificationProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        settings: GuardrailSettings,
    ) -> Self {
        Self {
            classifier,
            embeddings,
            settings,
            domain_embedding: OnceCell::new(),
        }
    }

    pub async fn evaluate(&self, query: &str) -> Result<GuardrailDecision, ApiError> {
        let verdict = self
            .classifier
            .classify(CLASSIFIER_SYSTEM_PROMPT, query)
            .await?;

        let below_confidence = verdict
            .confidence
            .is_some_and(|c| c < self.settings.confidence_threshold);

        let refined_query = match verdict.refined_query.trim() {
            "" => query.trim().to_string(),
            refined => refined.to_string(),
        };

        if !verdict.is_on_topic || below_confidence {
            let clarification = verdict
                .clarification
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| CLASSIFICATION_FALLBACK.to_string());
            tracing::info!(
                stage = RejectionStage::LlmClassification.as_str(),
                on_topic = verdict.is_on_topic,
                confidence = ?verdict.confidence,
                "Guardrail rejected query"
            );
            return Ok(GuardrailDecision::reject(
                RejectionStage::LlmClassification,
                refined_query,
                verdict.confidence,
                None,
                clarification,
            ));
        }

        let (query_embedding, domain_embedding) = tokio::try_join!(
            self.embeddings.embed_one(&refined_query),
            self.domain_embedding(),
        )?;
        let score = cosine_similarity(&query_embedding, domain_embedding)?;

        if score < self.settings.similarity_threshold {
            tracing::info!(
                stage = RejectionStage::EmbeddingSimilarity.as_str(),
                confidence = ?verdict.confidence,
                score,
                threshold = self.settings.similarity_threshold,
                "Guardrail rejected query"
            );
            return Ok(GuardrailDecision::reject(
                RejectionStage::EmbeddingSimilarity,
                refined_query,
                verdict.confidence,
                Some(score),
                SIMILARITY_CLARIFICATION.to_string(),
            ));
        }

        tracing::info!(confidence = ?verdict.confidence, score, "Guardrail accepted query");
        Ok(GuardrailDecision::accept(
            refined_query,
            verdict.confidence,
            score,
        ))
    }

    /// The description never changes, so its vector is computed once per
    /// process. A failed attempt leaves the cell empty for the next request.
    async fn domain_embedding(&self) -> Result<&Vec<f32>, ApiError> {
        self.domain_embedding
            .get_or_try_init(|| self.embeddings.embed_one(&self.settings.domain_description))
            .await
    }
}
