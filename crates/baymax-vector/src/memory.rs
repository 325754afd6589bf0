//! In-process collection for tests and ephemeral runs.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use baymax_core::traits::VectorIndex;
use baymax_core::types::{BuildInfo, IndexEntry, ScoredPassage};
use baymax_core::{Error, Result};

/// Holds one snapshot of entries. `upsert_all` swaps the snapshot in a single
/// write so a concurrent query sees either the old or the new contents.
#[derive(Default)]
pub struct MemoryIndex {
	entries: RwLock<Arc<Vec<IndexEntry>>>,
	info: RwLock<Option<BuildInfo>>,
}

impl MemoryIndex {
	pub fn new() -> Self { Self::default() }

	fn snapshot(&self) -> Result<Arc<Vec<IndexEntry>>> {
		self.entries.read().map(|g| Arc::clone(&*g)).map_err(|_| Error::index("memory index lock poisoned"))
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
	if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
	async fn upsert_all(&self, entries: &[IndexEntry]) -> Result<usize> {
		if let Some(first) = entries.first() {
			let dim = first.embedding.len();
			if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dim) {
				return Err(Error::DimensionMismatch { expected: dim, actual: bad.embedding.len() });
			}
		}
		let next = Arc::new(entries.to_vec());
		let mut guard = self.entries.write().map_err(|_| Error::index("memory index lock poisoned"))?;
		*guard = next;
		Ok(entries.len())
	}

	async fn query_top_k(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
		let snap = self.snapshot()?;
		let Some(first) = snap.first() else { return Ok(Vec::new()) };
		if first.embedding.len() != embedding.len() {
			return Err(Error::DimensionMismatch { expected: first.embedding.len(), actual: embedding.len() });
		}
		let mut hits: Vec<ScoredPassage> = snap
			.iter()
			.map(|e| ScoredPassage { id: e.id.clone(), score: cosine(&e.embedding, embedding), passage: e.passage.clone() })
			.collect();
		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
		hits.truncate(k);
		Ok(hits)
	}

	async fn count(&self) -> Result<usize> {
		Ok(self.snapshot()?.len())
	}

	async fn dimension(&self) -> Result<Option<usize>> {
		Ok(self.snapshot()?.first().map(|e| e.embedding.len()))
	}

	async fn record_build(&self, info: &BuildInfo) -> Result<()> {
		let mut guard = self.info.write().map_err(|_| Error::index("memory index lock poisoned"))?;
		*guard = Some(info.clone());
		Ok(())
	}

	async fn build_info(&self) -> Result<Option<BuildInfo>> {
		let guard = self.info.read().map_err(|_| Error::index("memory index lock poisoned"))?;
		Ok(guard.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use baymax_core::types::{Attribution, Passage};

	fn entry(id: &str, v: Vec<f32>) -> IndexEntry {
		IndexEntry { id: id.into(), embedding: v, passage: Passage { text: id.into(), metadata: Attribution::default() } }
	}

	#[tokio::test]
	async fn ranks_by_cosine_and_replaces_wholesale() {
		let idx = MemoryIndex::new();
		idx.upsert_all(&[entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])]).await.unwrap();
		let hits = idx.query_top_k(&[0.9, 0.1], 2).await.unwrap();
		assert_eq!(hits[0].id, "a");
		assert!(hits[0].score >= hits[1].score);

		idx.upsert_all(&[entry("c", vec![1.0, 1.0])]).await.unwrap();
		assert_eq!(idx.count().await.unwrap(), 1);
		assert_eq!(idx.query_top_k(&[1.0, 0.0], 5).await.unwrap()[0].id, "c");
	}

	#[tokio::test]
	async fn wrong_query_width_is_rejected() {
		let idx = MemoryIndex::new();
		idx.upsert_all(&[entry("a", vec![1.0, 0.0, 0.0])]).await.unwrap();
		let err = idx.query_top_k(&[1.0, 0.0], 1).await.unwrap_err();
		assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
	}

	#[tokio::test]
	async fn empty_index_returns_nothing() {
		let idx = MemoryIndex::new();
		assert!(idx.query_top_k(&[1.0], 3).await.unwrap().is_empty());
		assert_eq!(idx.dimension().await.unwrap(), None);
	}
}
