use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BuildInfo, IndexEntry, ScoredPassage};

/// Turns text into fixed-width vectors. Index and query vectors must come from
/// the same `embedder_id`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `ollama:nomic-embed-text`).
    fn embedder_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }
}

/// A named collection of embedded passages.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Replaces the whole collection with `entries`. Works on a missing or
    /// empty collection. Readers observe either the old or the new contents.
    async fn upsert_all(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Up to `k` entries, closest first. An empty or missing collection yields
    /// an empty vector.
    async fn query_top_k(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredPassage>>;

    /// Number of stored entries; zero for a missing collection.
    async fn count(&self) -> Result<usize>;

    /// Vector width of the stored entries, `None` when empty.
    async fn dimension(&self) -> Result<Option<usize>>;

    /// Persists metadata about the rebuild that just completed.
    async fn record_build(&self, _info: &BuildInfo) -> Result<()> {
        Ok(())
    }

    async fn build_info(&self) -> Result<Option<BuildInfo>> {
        Ok(None)
    }
}

/// The opaque chat model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: Option<&str>) -> Result<String>;
}
