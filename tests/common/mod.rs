#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use ragline_backend::core::config::{AppPaths, ConfigService, Settings};
use ragline_backend::core::errors::ApiError;
use ragline_backend::llm::{
    ChatProvider, ChatRequest, ClassificationProvider, ClassificationVerdict, EmbeddingProvider,
};
use ragline_backend::rag::documents::{CaseStudyMetadata, WhitePaperChunkMetadata};
use ragline_backend::rag::{DocumentMetadata, RerankHit, Reranker, VectorCandidate, VectorSearch};
use ragline_backend::server;
use ragline_backend::state::{AppState, Providers};

pub const DOMAIN: &str = "radiology revenue cycle management";

/// Off-topic for "weather", on-topic otherwise; "explode" fails the call.
pub struct KeywordClassifier;

#[async_trait]
impl ClassificationProvider for KeywordClassifier {
    async fn classify(
        &self,
        _system_prompt: &str,
        query: &str,
    ) -> Result<ClassificationVerdict, ApiError> {
        if query.contains("explode") {
            return Err(ApiError::upstream("classifier unavailable"));
        }
        let on_topic = !query.to_lowercase().contains("weather");
        Ok(ClassificationVerdict {
            is_on_topic: on_topic,
            confidence: Some(if on_topic { 8 } else { 9 }),
            refined_query: query.trim().to_string(),
            clarification: (!on_topic)
                .then(|| "I can help with radiology billing questions.".to_string()),
        })
    }
}

/// The domain description maps to [1, 0]; "cardiology" lands far from it,
/// everything else close to it.
pub struct KeywordEmbeddings;

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddings {
    fn dimensions(&self) -> usize {
        2
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs
            .iter()
            .map(|text| {
                if text == DOMAIN {
                    vec![1.0, 0.0]
                } else if text.contains("cardiology") {
                    vec![0.3, 0.954]
                } else {
                    vec![0.9, 0.436]
                }
            })
            .collect())
    }
}

pub struct FixedVectors {
    pub candidates: Vec<VectorCandidate>,
}

#[async_trait]
impl VectorSearch for FixedVectors {
    async fn search(
        &self,
        _embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorCandidate>, ApiError> {
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }
}

/// Scores documents in submission order.
pub struct OrderReranker;

#[async_trait]
impl Reranker for OrderReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, ApiError> {
        Ok((0..documents.len().min(top_n))
            .map(|index| RerankHit {
                index,
                relevance_score: 0.9 - index as f32 * 0.1,
            })
            .collect())
    }
}

/// Asks for one search, then streams `chunks`. Records every prompt.
pub struct ScriptedChat {
    pub chunks: Vec<String>,
    pub prompts: Mutex<Vec<Vec<String>>>,
}

impl ScriptedChat {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

const SEARCH_DECISION: &str = r#"{"type":"tool_call","tool_name":"search_knowledge_base","tool_args":{"query":"reduce radiology denials"}}"#;

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let contents: Vec<String> =
            request.messages.iter().map(|m| m.content.clone()).collect();
        let already_searched = contents.iter().any(|c| c.contains("search_knowledge_base` result"));
        let exploded = contents.iter().any(|c| c.contains("explode"));
        self.prompts.lock().unwrap().push(contents);

        if exploded {
            return Err(ApiError::upstream("chat model unavailable"));
        }
        if already_searched {
            return Ok(r#"{"type":"final"}"#.to_string());
        }
        Ok(SEARCH_DECISION.to_string())
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        self.prompts
            .lock()
            .unwrap()
            .push(request.messages.iter().map(|m| m.content.clone()).collect());
        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for chunk in &self.chunks {
            let _ = tx.send(Ok(chunk.clone())).await;
        }
        Ok(rx)
    }
}

pub fn case_study(id: &str, title: &str) -> VectorCandidate {
    VectorCandidate {
        id: id.to_string(),
        score: 0.8,
        content: format!("{} content", title),
        metadata: DocumentMetadata::CaseStudy(CaseStudyMetadata {
            title: title.to_string(),
            client_name: "Metro Imaging".to_string(),
            ..Default::default()
        }),
    }
}

pub fn white_paper(id: &str, title: &str) -> VectorCandidate {
    VectorCandidate {
        id: id.to_string(),
        score: 0.7,
        content: format!("{} content", title),
        metadata: DocumentMetadata::WhitePaperChunk(WhitePaperChunkMetadata {
            title: title.to_string(),
            section_title: "Overview".to_string(),
            ..Default::default()
        }),
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.guardrail.domain_description = DOMAIN.to_string();
    settings
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub state: Arc<AppState>,
    pub chat: Arc<ScriptedChat>,
    _data_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_app(settings: Settings, candidates: Vec<VectorCandidate>) -> TestApp {
    let data_dir = tempfile::tempdir().expect("temp dir");
    let paths = Arc::new(AppPaths::under(data_dir.path()));
    let chat = Arc::new(ScriptedChat::new(&["Fix front-end ", "eligibility checks."]));
    let providers = Providers {
        chat: chat.clone(),
        classifier: Arc::new(KeywordClassifier),
        embeddings: Arc::new(KeywordEmbeddings),
        vectors: Arc::new(FixedVectors { candidates }),
        reranker: Arc::new(OrderReranker),
    };
    let state = AppState::with_providers(ConfigService::new(paths), settings, providers);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = server::router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    TestApp {
        addr,
        client: reqwest::Client::new(),
        state,
        chat,
        _data_dir: data_dir,
    }
}
