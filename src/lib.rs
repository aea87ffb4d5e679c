pub mod chat;
pub mod core;
pub mod guardrail;
pub mod llm;
pub mod rag;
pub mod rate_limit;
pub mod server;
pub mod state;
pub mod vector_math;
