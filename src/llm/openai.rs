//! OpenAI-compatible chat, structured classification and embedding adapters.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::{ChatProvider, ClassificationProvider, EmbeddingProvider};
use super::types::{ChatMessage, ChatRequest, ClassificationVerdict};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct OpenAiChatProvider {
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    classification_model: String,
    client: Client,
}

impl OpenAiChatProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        chat_model: String,
        classification_model: String,
        client: Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model,
            classification_model,
            client,
        }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        with_bearer(self.client.post(url), self.api_key.as_deref())
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let body = completion_body(&self.chat_model, &request, false);

        let res = self
            .post("/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "chat completion failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        let body = completion_body(&self.chat_model, &request, true);

        let res = self
            .post("/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "chat stream failed ({}): {}",
                status, text
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            // Bytes, not text: a UTF-8 sequence may straddle two network chunks.
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                            let raw: Vec<u8> = buffer.drain(..=newline).collect();
                            let line = String::from_utf8_lossy(&raw);
                            match parse_stream_line(&line) {
                                StreamLine::Content(content) => {
                                    if tx.send(Ok(content)).await.is_err() {
                                        return;
                                    }
                                }
                                StreamLine::Done => return,
                                StreamLine::Skip => {}
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ApiError::upstream(e))).await;
                        return;
                    }
                }
            }
            let tail = String::from_utf8_lossy(&buffer);
            if let StreamLine::Content(content) = parse_stream_line(&tail) {
                let _ = tx.send(Ok(content)).await;
            }
        });

        Ok(rx)
    }
}

#[async_trait]
impl ClassificationProvider for OpenAiChatProvider {
    async fn classify(
        &self,
        system_prompt: &str,
        query: &str,
    ) -> Result<ClassificationVerdict, ApiError> {
        let schema = serde_json::to_value(schemars::schema_for!(ClassificationVerdict))
            .map_err(ApiError::internal)?;
        let messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(query)];

        let body = json!({
            "model": self.classification_model,
            "messages": messages,
            "temperature": 0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "classification_verdict",
                    "schema": schema,
                },
            },
        });

        let res = self
            .post("/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "classification failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ApiError::upstream("classification response had no content"))?;

        parse_verdict(content)
    }
}

#[derive(Clone)]
pub struct OpenAiEmbeddingProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    client: Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        dimensions: usize,
        client: Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            dimensions,
            client,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = json!({
            "model": self.model,
            "input": inputs,
            "dimensions": self.dimensions,
        });

        let res = with_bearer(self.client.post(&url), self.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "embedding failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;

        let mut indexed = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for (position, item) in data.iter().enumerate() {
                let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    indexed.push((index, vec));
                }
            }
        }
        indexed.sort_by_key(|(index, _)| *index);

        if indexed.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "embedding count mismatch: {} != {}",
                indexed.len(),
                inputs.len()
            )));
        }

        Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
    }
}

fn with_bearer(builder: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => builder.bearer_auth(key),
        None => builder,
    }
}

fn completion_body(model: &str, request: &ChatRequest, stream: bool) -> Value {
    let mut body = json!({
        "model": model,
        "messages": request.messages,
        "stream": stream,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
    }

    body
}

enum StreamLine {
    Content(String),
    Done,
    Skip,
}

fn parse_stream_line(line: &str) -> StreamLine {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return StreamLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return StreamLine::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(json) => match json["choices"][0]["delta"]["content"].as_str() {
            Some(content) if !content.is_empty() => StreamLine::Content(content.to_string()),
            _ => StreamLine::Skip,
        },
        Err(_) => StreamLine::Skip,
    }
}

fn parse_verdict(content: &str) -> Result<ClassificationVerdict, ApiError> {
    let trimmed = content.trim();
    if let Ok(verdict) = serde_json::from_str::<ClassificationVerdict>(trimmed) {
        return Ok(verdict);
    }

    // Some models wrap the object in prose or a code fence.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            let candidate = &trimmed[start..=end];
            if let Ok(verdict) = serde_json::from_str::<ClassificationVerdict>(candidate) {
                return Ok(verdict);
            }
        }
    }

    Err(ApiError::Upstream(format!(
        "malformed classification verdict: {}",
        trimmed.chars().take(200).collect::<String>()
    )))
}
