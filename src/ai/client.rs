use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::*;

/// Request/response capability handed to agents. Holds no conversation
/// history; every call is independent.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier used for completions.
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Client for any OpenAI-compatible chat completions endpoint (Ollama,
/// llama.cpp server, vLLM, ...).
pub struct OpenAiClient {
    http: Client,
    handle: BackendHandle,
}

impl OpenAiClient {
    pub fn new(http: Client, handle: BackendHandle) -> Self {
        Self { http, handle }
    }

    fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.handle.endpoint_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.handle.model_identifier
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatCompletionRequest::from_completion(&self.handle.model_identifier, request);

        let mut req = self.http.post(self.url()).json(&body);
        if let Some(key) = self.handle.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .context("Failed to send request to model backend")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Model backend error {status}: {body}");
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .context("Malformed chat completion response")?;
        let text = parsed
            .into_text()
            .ok_or_else(|| anyhow::anyhow!("Chat completion response has no message content"))?;
        debug!("Completion returned {} bytes", text.len());
        Ok(text)
    }
}

/// Build the shared model client. Only called once the availability probe
/// has succeeded.
pub fn build_client(http: Client, handle: BackendHandle) -> Arc<dyn ModelClient> {
    Arc::new(OpenAiClient::new(http, handle))
}
