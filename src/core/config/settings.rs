//! Typed view over the merged configuration document.
//!
//! Every field has a default so a missing `config.yml` still yields a
//! runnable (if unauthenticated) service.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub server: ServerSettings,
    pub providers: ProviderSettings,
    pub guardrail: GuardrailSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Upper bound on the query length accepted by either endpoint.
    pub max_input_length: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_input_length: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub request_timeout_secs: u64,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub rerank: RerankSettings,
    pub vector: VectorSettings,
    pub observability: ObservabilitySettings,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            rerank: RerankSettings::default(),
            vector: VectorSettings::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub classification_model: String,
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            classification_model: "gpt-4o-mini".to_string(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "text-embedding-3-large".to_string(),
            dimensions: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.cohere.com/v2".to_string(),
            api_key: None,
            model: "rerank-v3.5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub collection: String,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "knowledge_base".to_string(),
        }
    }
}

/// Optional LLM observability gateway. When `api_key` is set, provider
/// clients carry the gateway auth header; `base_url` reroutes LLM traffic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailSettings {
    /// Minimum classifier confidence (1-10) for a query to reach stage 2.
    pub confidence_threshold: u8,
    /// Minimum cosine similarity against the domain description.
    pub similarity_threshold: f32,
    pub domain_description: String,
}

impl Default for GuardrailSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 4,
            similarity_threshold: 0.4,
            domain_description: defaults::DOMAIN_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub total_candidates: usize,
    pub case_study_limit: usize,
    pub white_paper_limit: usize,
    pub case_study_rerank_top: usize,
    pub white_paper_rerank_top: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            total_candidates: 14,
            case_study_limit: 4,
            white_paper_limit: 10,
            case_study_rerank_top: 1,
            white_paper_rerank_top: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub max_steps: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { max_steps: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub requests: u32,
    pub window_ms: u64,
    pub sweep_interval_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests: 20,
            window_ms: 60_000,
            sweep_interval_ms: 60_000,
        }
    }
}
