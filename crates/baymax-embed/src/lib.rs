//! baymax-embed
//!
//! Embedding gateways: the Ollama HTTP client used in production and a
//! hashing `FakeEmbedder` for offline development and tests.

use tracing::info;

use baymax_core::config::{EmbeddingProvider, EmbeddingSettings};
use baymax_core::traits::Embedder;
use baymax_core::Result;

mod fake;
mod ollama;

pub use fake::FakeEmbedder;
pub use ollama::OllamaEmbedder;

/// Honors `APP_USE_FAKE_EMBEDDINGS=1` on top of `embedding.provider`.
pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if settings.provider == EmbeddingProvider::Fake || use_fake_embeddings() {
        info!("Using FakeEmbedder (d={})", settings.fake_dim);
        return Ok(Box::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let embedder = OllamaEmbedder::new(settings)?;
    info!("Using Ollama embeddings: model={} endpoint={}", settings.model, embedder.endpoint());
    Ok(Box::new(embedder))
}
