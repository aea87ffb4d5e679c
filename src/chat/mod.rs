//! Retrieval-augmented answer generation.
//!
//! `ChatAgent` runs a bounded tool loop: the model either asks for a
//! knowledge-base search or declares it is ready, and the final answer is
//! streamed from a separate completion over everything gathered. The search
//! always runs at least once before any answer text is produced.

pub mod instructions;

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatProvider, ChatRequest};
use crate::rag::RetrievalAgent;

use instructions::{
    build_agent_instructions, build_answer_instructions, format_tool_result, SEARCH_TOOL,
};

pub type ChunkSender = mpsc::Sender<Result<String, ApiError>>;

pub struct ChatAgent {
    provider: Arc<dyn ChatProvider>,
    retrieval: Arc<RetrievalAgent>,
    max_steps: usize,
    temperature: Option<f32>,
}

impl ChatAgent {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        retrieval: Arc<RetrievalAgent>,
        max_steps: usize,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            provider,
            retrieval,
            max_steps: max_steps.max(1),
            temperature,
        }
    }

    /// Answers the conversation, sending text chunks to `sender`.
    ///
    /// Returns early without error once the receiving side is gone. Every
    /// downstream call is raced against that, so a call already in flight is
    /// dropped and nothing after it is issued.
    pub async fn run(
        &self,
        history: Vec<ChatMessage>,
        sender: &ChunkSender,
    ) -> Result<(), ApiError> {
        let query = last_user_message(&history)
            .ok_or_else(|| ApiError::Validation(vec!["messages: no user message".to_string()]))?
            .to_string();

        let mut messages = Vec::with_capacity(history.len() + self.max_steps + 2);
        messages.push(ChatMessage::system(build_agent_instructions(self.max_steps)));
        messages.extend(history);

        let mut searches = 0usize;
        let mut documents_found = 0usize;

        // The last step is reserved for the streamed answer.
        for step in 0..self.max_steps.saturating_sub(1) {
            let request = ChatRequest::new(messages.clone()).with_temperature(self.temperature);
            let Some(response) = unless_closed(sender, self.provider.chat(request)).await else {
                tracing::debug!("Client went away during step {}", step + 1);
                return Ok(());
            };

            match parse_agent_decision(&response?) {
                AgentDecision::Final => {
                    tracing::debug!(step = step + 1, searches, "Model is ready to answer");
                    break;
                }
                AgentDecision::ToolCall { name, args } if name == SEARCH_TOOL => {
                    let search_query = args
                        .get("query")
                        .and_then(|v| v.as_str())
                        .map(str::trim)
                        .filter(|q| !q.is_empty())
                        .unwrap_or(query.as_str())
                        .to_string();

                    let Some(found) = self.search(&search_query, &mut messages, sender).await
                    else {
                        return Ok(());
                    };
                    searches += 1;
                    documents_found += found;
                    tracing::info!(
                        step = step + 1,
                        max_steps = self.max_steps,
                        documents = found,
                        "Executed tool {}",
                        SEARCH_TOOL
                    );
                }
                AgentDecision::ToolCall { name, .. } => {
                    tracing::warn!("Model requested unknown tool `{}`", name);
                    messages.push(ChatMessage::system(format!(
                        "Tool `{}` failed: unknown tool. The only available tool is `{}`.",
                        name, SEARCH_TOOL
                    )));
                }
            }
        }

        if searches == 0 {
            let Some(found) = self.search(&query, &mut messages, sender).await else {
                return Ok(());
            };
            documents_found += found;
        }

        messages.push(ChatMessage::system(build_answer_instructions(documents_found > 0)));

        let request = ChatRequest::new(messages).with_temperature(self.temperature);
        let Some(stream) = unless_closed(sender, self.provider.stream_chat(request)).await else {
            return Ok(());
        };
        let mut stream = stream?;

        while let Some(Some(chunk)) = unless_closed(sender, stream.recv()).await {
            let failed = chunk.is_err();
            if sender.send(chunk).await.is_err() {
                tracing::debug!("Client went away during streaming");
                return Ok(());
            }
            if failed {
                break;
            }
        }

        Ok(())
    }

    /// Runs one retrieval and records its result for the model. `None` means
    /// the client went away while retrieval was in flight.
    async fn search(
        &self,
        query: &str,
        messages: &mut Vec<ChatMessage>,
        sender: &ChunkSender,
    ) -> Option<usize> {
        let Some(documents) = unless_closed(sender, self.retrieval.retrieve(query)).await else {
            tracing::debug!("Client went away during knowledge base retrieval");
            return None;
        };
        messages.push(ChatMessage::system(format_tool_result(query, &documents)));
        Some(documents.len())
    }
}

/// Drives `work` to completion unless the receiver is dropped first, in which
/// case `work` is dropped where it stands.
async fn unless_closed<T>(sender: &ChunkSender, work: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = sender.closed() => None,
        value = work => Some(value),
    }
}

fn last_user_message(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
}

#[derive(Debug, PartialEq)]
enum AgentDecision {
    Final,
    ToolCall { name: String, args: Value },
}

/// Anything that is not a recognisable tool call counts as "ready to answer".
fn parse_agent_decision(text: &str) -> AgentDecision {
    parse_json_from_text(text)
        .and_then(|value| parse_decision_from_value(&value))
        .unwrap_or(AgentDecision::Final)
}

fn parse_json_from_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

fn parse_decision_from_value(value: &Value) -> Option<AgentDecision> {
    let action_type = value
        .get("type")
        .or_else(|| value.get("action"))
        .and_then(|v| v.as_str())?;

    match action_type {
        "tool_call" => {
            let name = value
                .get("tool_name")
                .or_else(|| value.get("name"))
                .or_else(|| value.get("tool"))
                .and_then(|v| v.as_str())?;
            let args = value
                .get("tool_args")
                .or_else(|| value.get("args"))
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            Some(AgentDecision::ToolCall {
                name: name.to_string(),
                args,
            })
        }
        "final" => Some(AgentDecision::Final),
        _ => None,
    }
}
