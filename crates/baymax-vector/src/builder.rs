//! Full rebuild of a collection: normalize, embed, replace, record.

use fs2::FileExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use baymax_core::corpus::{CorpusNormalizer, CorpusPaths, SkippedRecord};
use baymax_core::traits::{Embedder, VectorIndex};
use baymax_core::types::{sequential_id, BuildInfo, IndexEntry, Passage};
use baymax_core::{Error, Result};

use crate::LanceVectorIndex;

/// Advisory exclusive lock on `<collection>.build.lock`, held for the whole
/// rebuild. The OS drops it with the process, so a file left behind by a
/// crashed build does not block the next one.
#[derive(Debug)]
pub struct BuildLock {
	file: File,
	path: PathBuf,
}

impl BuildLock {
	pub fn acquire(path: &Path) -> Result<Self> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).map_err(Error::index)?;
		}
		let mut file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(false)
			.open(path)
			.map_err(|e| Error::index(format!("cannot open build lock {}: {}", path.display(), e)))?;
		match file.try_lock_exclusive() {
			Ok(()) => {}
			Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Err(Error::BuildInProgress(path.to_path_buf())),
			Err(e) => return Err(Error::index(format!("cannot lock {}: {}", path.display(), e))),
		}
		if let Err(e) = write_holder(&mut file) {
			warn!("could not record pid in {}: {}", path.display(), e);
		}
		Ok(Self { file, path: path.to_path_buf() })
	}

	pub fn path(&self) -> &Path { &self.path }
}

fn write_holder(file: &mut File) -> io::Result<()> {
	file.set_len(0)?;
	file.seek(SeekFrom::Start(0))?;
	writeln!(file, "{}", std::process::id())
}

impl Drop for BuildLock {
	fn drop(&mut self) {
		// The file stays; removing it could race a process that already opened it.
		if let Err(e) = FileExt::unlock(&self.file) {
			warn!("failed to release build lock {}: {}", self.path.display(), e);
		}
	}
}

/// Outcome of one rebuild.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
	pub indexed: usize,
	pub skipped: Vec<SkippedRecord>,
	pub unavailable: Vec<PathBuf>,
	/// What was recorded for the collection; `None` only on a default report.
	pub info: Option<BuildInfo>,
}

impl BuildReport {
	pub fn is_empty(&self) -> bool { self.indexed == 0 }
}

pub struct IndexBuilder<V: VectorIndex> {
	index: V,
	embedder: Box<dyn Embedder>,
	normalizer: CorpusNormalizer,
	batch_size: usize,
	lock_path: Option<PathBuf>,
	collection: String,
	location: String,
	show_progress: bool,
}

impl<V: VectorIndex> IndexBuilder<V> {
	pub fn new(index: V, embedder: Box<dyn Embedder>) -> Self {
		Self {
			index,
			embedder,
			normalizer: CorpusNormalizer::new(),
			batch_size: 64,
			lock_path: None,
			collection: "memory".into(),
			location: "memory".into(),
			show_progress: std::io::stderr().is_terminal(),
		}
	}

	pub fn with_normalizer(mut self, normalizer: CorpusNormalizer) -> Self { self.normalizer = normalizer; self }

	pub fn with_batch_size(mut self, batch_size: usize) -> Self { self.batch_size = batch_size.max(1); self }

	pub fn with_lock(mut self, path: PathBuf) -> Self { self.lock_path = Some(path); self }

	/// Names used in the summary log line.
	pub fn with_label(mut self, collection: &str, location: &str) -> Self {
		self.collection = collection.to_string();
		self.location = location.to_string();
		self
	}

	pub fn with_progress(mut self, show: bool) -> Self { self.show_progress = show; self }

	pub fn index(&self) -> &V { &self.index }

	pub fn into_index(self) -> V { self.index }

	/// Normalizes both knowledge files and replaces the collection with them.
	pub async fn rebuild(&self, paths: &CorpusPaths) -> Result<BuildReport> {
		let _lock = self.lock()?;
		let normalized = self.normalizer.process_files(paths)?;
		let mut report = self.write_passages(normalized.passages).await?;
		report.skipped = normalized.skipped;
		report.unavailable = normalized.unavailable;
		Ok(report)
	}

	/// Replaces the collection with already-normalized passages.
	pub async fn rebuild_passages(&self, passages: Vec<Passage>) -> Result<BuildReport> {
		let _lock = self.lock()?;
		self.write_passages(passages).await
	}

	fn lock(&self) -> Result<Option<BuildLock>> {
		self.lock_path.as_deref().map(BuildLock::acquire).transpose()
	}

	async fn write_passages(&self, passages: Vec<Passage>) -> Result<BuildReport> {
		if passages.is_empty() {
			self.index.upsert_all(&[]).await?;
			let info = self.build_info(0, 0);
			self.index.record_build(&info).await?;
			info!("nothing to index; collection '{}' at '{}' cleared", self.collection, self.location);
			return Ok(BuildReport { info: Some(info), ..BuildReport::default() });
		}

		let embeddings = self.embed_all(&passages).await?;
		let dimension = embeddings.first().map_or(0, Vec::len);
		if dimension == 0 {
			return Err(Error::EmbeddingUnavailable("gateway returned an empty vector".into()));
		}
		if let Some(bad) = embeddings.iter().find(|v| v.len() != dimension) {
			return Err(Error::DimensionMismatch { expected: dimension, actual: bad.len() });
		}

		let entries: Vec<IndexEntry> = passages
			.into_iter()
			.zip(embeddings)
			.enumerate()
			.map(|(i, (passage, embedding))| IndexEntry { id: sequential_id(i), embedding, passage })
			.collect();
		let indexed = self.index.upsert_all(&entries).await?;

		// Readers may see the new rows beside the previous build info until this lands.
		let info = self.build_info(dimension, indexed);
		self.index.record_build(&info).await?;
		info!("Indexed {} passages into collection '{}' at '{}'", indexed, self.collection, self.location);
		Ok(BuildReport { indexed, info: Some(info), ..BuildReport::default() })
	}

	fn build_info(&self, dimension: usize, passage_count: usize) -> BuildInfo {
		BuildInfo {
			embedder_id: self.embedder.embedder_id().to_string(),
			dimension,
			passage_count,
			built_at: chrono::Utc::now().to_rfc3339(),
		}
	}

	/// Embeds every passage text, batch by batch. Any failure aborts before
	/// the collection is touched.
	async fn embed_all(&self, passages: &[Passage]) -> Result<Vec<Vec<f32>>> {
		let pb = if self.show_progress { ProgressBar::new(passages.len() as u64) } else { ProgressBar::hidden() };
		if let Ok(style) = ProgressStyle::default_bar()
			.template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} passages ({percent}%) {msg}")
		{
			pb.set_style(style.progress_chars("#>-"));
		}

		let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
		let mut out = Vec::with_capacity(texts.len());
		for (n, batch) in texts.chunks(self.batch_size).enumerate() {
			let vectors = match self.embedder.embed_batch(batch).await {
				Ok(v) => v,
				Err(e) => {
					pb.abandon_with_message("embedding failed");
					return Err(e);
				}
			};
			if vectors.len() != batch.len() {
				pb.abandon_with_message("embedding failed");
				return Err(Error::EmbeddingUnavailable(format!(
					"gateway returned {} vectors for {} passages",
					vectors.len(),
					batch.len()
				)));
			}
			debug!(batch = n, size = batch.len(), "embedded batch");
			out.extend(vectors);
			pb.inc(batch.len() as u64);
		}
		pb.finish_with_message("embedded");
		Ok(out)
	}
}

impl IndexBuilder<LanceVectorIndex> {
	/// A builder that takes the collection's build lock and labels its log
	/// line with the collection name and directory.
	pub fn for_lance(index: LanceVectorIndex, embedder: Box<dyn Embedder>) -> Self {
		let lock = index.lock_path();
		let collection = index.collection().to_string();
		let location = index.persist_dir().display().to_string();
		Self::new(index, embedder).with_lock(lock).with_label(&collection, &location)
	}
}
