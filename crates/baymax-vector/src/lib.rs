//! Persistent passage collections backed by LanceDB, plus the rebuild driver.

use async_trait::async_trait;
use lancedb::{Connection, Table};
use std::path::{Path, PathBuf};

use baymax_core::traits::VectorIndex;
use baymax_core::types::{BuildInfo, IndexEntry, ScoredPassage};
use baymax_core::{Error, Result};

pub mod builder;
pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use builder::{BuildLock, BuildReport, IndexBuilder};
pub use memory::MemoryIndex;

/// One named collection inside a LanceDB directory.
pub struct LanceVectorIndex {
	db: Connection,
	collection: String,
	persist_dir: PathBuf,
}

impl LanceVectorIndex {
	pub async fn open(persist_dir: &Path, collection: &str) -> Result<Self> {
		let db = table::open_dir(persist_dir).await.map_err(Error::index)?;
		Ok(Self { db, collection: collection.to_string(), persist_dir: persist_dir.to_path_buf() })
	}

	pub fn collection(&self) -> &str { &self.collection }

	pub fn persist_dir(&self) -> &Path { &self.persist_dir }

	/// Where a rebuild of this collection takes its exclusive lock.
	pub fn lock_path(&self) -> PathBuf {
		self.persist_dir.join(format!("{}.build.lock", self.collection))
	}

	async fn open_table(&self) -> Result<Option<Table>> {
		if !table::table_exists(&self.db, &self.collection).await.map_err(Error::index)? {
			return Ok(None);
		}
		let t = self.db.open_table(&self.collection).execute().await.map_err(Error::index)?;
		Ok(Some(t))
	}
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
	async fn upsert_all(&self, entries: &[IndexEntry]) -> Result<usize> {
		writer::overwrite_table(&self.db, &self.collection, entries).await.map_err(Error::index)
	}

	async fn query_top_k(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
		if k == 0 { return Ok(Vec::new()); }
		let Some(t) = self.open_table().await? else { return Ok(Vec::new()) };
		if t.count_rows(None).await.map_err(Error::index)? == 0 { return Ok(Vec::new()); }
		let stored = t.schema().await.map_err(Error::index)?;
		if let Some(expected) = schema::vector_dim(&stored) {
			if expected != embedding.len() {
				return Err(Error::DimensionMismatch { expected, actual: embedding.len() });
			}
		}
		search::search_vec(&t, embedding, k).await.map_err(Error::index)
	}

	async fn count(&self) -> Result<usize> {
		match self.open_table().await? {
			Some(t) => t.count_rows(None).await.map_err(Error::index),
			None => Ok(0),
		}
	}

	async fn dimension(&self) -> Result<Option<usize>> {
		let Some(t) = self.open_table().await? else { return Ok(None) };
		if t.count_rows(None).await.map_err(Error::index)? == 0 { return Ok(None); }
		let stored = t.schema().await.map_err(Error::index)?;
		Ok(schema::vector_dim(&stored))
	}

	async fn record_build(&self, info: &BuildInfo) -> Result<()> {
		table::write_build_info(&self.db, &self.collection, info).await.map_err(Error::index)
	}

	async fn build_info(&self) -> Result<Option<BuildInfo>> {
		table::read_build_info(&self.db, &self.collection).await.map_err(Error::index)
	}
}
