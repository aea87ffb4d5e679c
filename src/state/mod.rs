use std::sync::Arc;

use crate::chat::ChatAgent;
use crate::core::config::{ConfigService, Settings};
use crate::guardrail::Guardrail;
use crate::llm::http_client::{build_observed_client, build_plain_client, resolve_llm_base_url};
use crate::llm::{
    ChatProvider, ClassificationProvider, EmbeddingProvider, OpenAiChatProvider,
    OpenAiEmbeddingProvider,
};
use crate::rag::{CohereReranker, QdrantSearch, Reranker, RetrievalAgent, VectorSearch};
use crate::rate_limit::RateLimiter;

pub mod error;

use error::InitializationError;

/// External services the request pipeline talks to.
#[derive(Clone)]
pub struct Providers {
    pub chat: Arc<dyn ChatProvider>,
    pub classifier: Arc<dyn ClassificationProvider>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub vectors: Arc<dyn VectorSearch>,
    pub reranker: Arc<dyn Reranker>,
}

impl Providers {
    /// OpenAI-compatible LLM and embedding endpoints, Qdrant and a
    /// Cohere-compatible re-ranker, as configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, InitializationError> {
        let providers = &settings.providers;
        let observed = build_observed_client(providers).map_err(InitializationError::HttpClient)?;
        let plain = build_plain_client(providers).map_err(InitializationError::HttpClient)?;

        let llm = Arc::new(OpenAiChatProvider::new(
            resolve_llm_base_url(&providers.llm.base_url, &providers.observability),
            providers.llm.api_key.clone(),
            providers.llm.chat_model.clone(),
            providers.llm.classification_model.clone(),
            observed.clone(),
        ));
        let embeddings = Arc::new(OpenAiEmbeddingProvider::new(
            resolve_llm_base_url(&providers.embedding.base_url, &providers.observability),
            providers.embedding.api_key.clone(),
            providers.embedding.model.clone(),
            providers.embedding.dimensions,
            observed,
        ));
        let vectors = Arc::new(QdrantSearch::new(
            providers.vector.base_url.clone(),
            providers.vector.api_key.clone(),
            providers.vector.collection.clone(),
            plain.clone(),
        ));
        let reranker = Arc::new(CohereReranker::new(
            providers.rerank.base_url.clone(),
            providers.rerank.api_key.clone(),
            providers.rerank.model.clone(),
            plain,
        ));

        Ok(Self {
            chat: llm.clone(),
            classifier: llm,
            embeddings,
            vectors,
            reranker,
        })
    }
}

/// Shared application state.
///
/// Holds the configuration, the guardrail, the chat agent (which owns the
/// retrieval agent) and the rate limiter. Everything else is request scoped.
#[derive(Clone)]
pub struct AppState {
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub guardrail: Arc<Guardrail>,
    pub chat: Arc<ChatAgent>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Loads settings through `config` and wires the real provider adapters.
    /// Must run inside a Tokio runtime; the rate limiter starts its sweeper here.
    pub fn initialize(config: ConfigService) -> Result<Arc<Self>, InitializationError> {
        let settings = config.load_settings().map_err(InitializationError::Config)?;
        let providers = Providers::from_settings(&settings)?;
        tracing::info!(
            chat_model = %settings.providers.llm.chat_model,
            embedding_model = %settings.providers.embedding.model,
            collection = %settings.providers.vector.collection,
            "Providers configured"
        );
        Ok(Self::with_providers(config, settings, providers))
    }

    pub fn with_providers(
        config: ConfigService,
        settings: Settings,
        providers: Providers,
    ) -> Arc<Self> {
        let guardrail = Guardrail::new(
            providers.classifier,
            providers.embeddings.clone(),
            settings.guardrail.clone(),
        );
        let retrieval = RetrievalAgent::new(
            providers.embeddings,
            providers.vectors,
            providers.reranker,
            settings.retrieval.clone(),
        );
        let chat = ChatAgent::new(
            providers.chat,
            Arc::new(retrieval),
            settings.generation.max_steps,
            settings.providers.llm.temperature,
        );
        let rate_limiter = RateLimiter::in_memory(&settings.rate_limit);

        Arc::new(AppState {
            config,
            settings: Arc::new(settings),
            guardrail: Arc::new(guardrail),
            chat: Arc::new(chat),
            rate_limiter: Arc::new(rate_limiter),
        })
    }
}
