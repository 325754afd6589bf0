use tracing::debug;

use baymax_core::traits::{Embedder, VectorIndex};
use baymax_core::types::RetrievalResult;
use baymax_core::{Error, Result};

/// Embeds a query and looks up its nearest passages. Never writes to the index.
pub struct Retriever<V: VectorIndex> {
    index: V,
    embedder: Box<dyn Embedder>,
}

impl<V: VectorIndex> Retriever<V> {
    pub fn new(index: V, embedder: Box<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Gateway failures propagate; an empty collection is an empty result.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        self.check_build().await?;
        let q_vec = self.embedder.embed(query).await?;
        let hits = self.index.query_top_k(&q_vec, k).await?;
        debug!("Retrieved {} passages (k={})", hits.len(), k);
        Ok(RetrievalResult { hits })
    }

    // Vectors from a different model are meaningless neighbours even when the width matches.
    async fn check_build(&self) -> Result<()> {
        let Some(info) = self.index.build_info().await? else { return Ok(()) };
        if info.passage_count == 0 {
            return Ok(());
        }
        let live = self.embedder.embedder_id();
        if info.embedder_id != live {
            return Err(Error::Index(format!(
                "collection was built with '{}' but queries use '{}'; rebuild the index",
                info.embedder_id, live
            )));
        }
        Ok(())
    }
}
