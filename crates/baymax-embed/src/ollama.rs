//! Ollama embedding gateway (`POST /api/embeddings`).

use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use baymax_core::config::EmbeddingSettings;
use baymax_core::traits::Embedder;
use baymax_core::{Error, Result};

const MAX_ERROR_BODY: usize = 200;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    id: String,
    concurrency: usize,
}

impl OllamaEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("embedding client: {e}")))?;
        let endpoint = format!("{}/api/embeddings", settings.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model: settings.model.clone(),
            id: format!("ollama:{}", settings.model),
            concurrency: settings.concurrency.max(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest { model: &self.model, prompt: text })
            .send()
            .await
            .map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingUnavailable(format!(
                "Ollama returned {status}: {}",
                truncate(body.trim(), MAX_ERROR_BODY)
            )));
        }
        let parsed: EmbeddingResponse = response.json().await.map_err(unavailable)?;
        if parsed.embedding.is_empty() {
            return Err(Error::EmbeddingUnavailable(format!("Ollama returned no embedding for model '{}'", self.model)));
        }
        Ok(parsed.embedding)
    }

    /// Up to `concurrency` requests in flight; output order follows input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} texts via {}", texts.len(), self.endpoint);
        let pending: Vec<_> = texts.iter().map(|t| self.embed(t)).collect();
        stream::iter(pending)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

fn unavailable(err: reqwest::Error) -> Error {
    let kind = if err.is_timeout() { "timed out" } else if err.is_connect() { "unreachable" } else { "failed" };
    Error::EmbeddingUnavailable(format!("Ollama request {kind}: {}", err.without_url()))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let settings = EmbeddingSettings { base_url: "http://localhost:11434/".into(), ..EmbeddingSettings::default() };
        let e = OllamaEmbedder::new(&settings).unwrap();
        assert_eq!(e.endpoint(), "http://localhost:11434/api/embeddings");
        assert_eq!(e.embedder_id(), "ollama:nomic-embed-text");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
