pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

pub use openai::{OpenAiChatProvider, OpenAiEmbeddingProvider};
pub use provider::{ChatProvider, ClassificationProvider, EmbeddingProvider};
pub use types::{ChatMessage, ChatRequest, ClassificationVerdict};
