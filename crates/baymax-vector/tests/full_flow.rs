use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use baymax_core::corpus::CorpusPaths;
use baymax_core::traits::{Embedder, VectorIndex};
use baymax_core::types::{Attribution, Passage};
use baymax_core::Error;
use baymax_embed::FakeEmbedder;
use baymax_vector::{BuildLock, IndexBuilder, LanceVectorIndex, MemoryIndex};
use tempfile::TempDir;

const DIM: usize = 32;

fn write_corpus(dir: &Path) -> CorpusPaths {
    let kb = serde_json::json!({
        "knowledge_base": [{
            "topic_id": "demam",
            "topic_name": "Demam",
            "sources": ["Kemenkes", "WHO"],
            "data": {
                "gejala": ["suhu tubuh di atas 38 derajat", "menggigil"],
                "penanganan": {"cairan": "minum air putih yang cukup", "obat": "parasetamol"}
            }
        }]
    });
    let mb = serde_json::json!([
        {"chunk_text": "Diare ditangani dengan oralit dan cairan.", "metadata": {"topic_id": "diare", "sources": "WHO"}},
        {"chunk_text": ""},
        {"no_text": true}
    ]);
    let kb_file = dir.join("kb.json");
    let mb_file = dir.join("mb.json");
    std::fs::write(&kb_file, kb.to_string()).expect("write kb");
    std::fs::write(&mb_file, mb.to_string()).expect("write mb");
    CorpusPaths { kb_file, mb_file }
}

fn fake() -> Box<dyn Embedder> {
    Box::new(FakeEmbedder::new(DIM))
}

#[tokio::test]
async fn lancedb_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let paths = write_corpus(tmp.path());
    let store_dir = tmp.path().join("rag_store");

    let index = LanceVectorIndex::open(&store_dir, "health_test").await.expect("open");
    let builder = IndexBuilder::for_lance(index, fake()).with_progress(false);
    let report = builder.rebuild(&paths).await.expect("rebuild");

    // Two sections from the topic, one valid flat record.
    assert_eq!(report.indexed, 3);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.unavailable.is_empty());
    BuildLock::acquire(&store_dir.join("health_test.build.lock")).expect("lock released");

    let index = builder.index();
    assert_eq!(index.count().await.unwrap(), 3);
    assert_eq!(index.dimension().await.unwrap(), Some(DIM));
    let info = index.build_info().await.unwrap().expect("build info");
    assert_eq!(info.passage_count, 3);
    assert_eq!(info.embedder_id, format!("fake:xxhash:d{DIM}"));

    let q = FakeEmbedder::new(DIM).embed("minum air putih yang cukup").await.unwrap();
    let hits = index.query_top_k(&q, 2).await.expect("query");
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
    for h in &hits {
        assert!(!h.passage.text.trim().is_empty());
        assert!(h.id.starts_with("doc-"));
    }
}

#[tokio::test]
async fn rebuild_twice_gives_same_collection() {
    let tmp = TempDir::new().expect("tmp");
    let paths = write_corpus(tmp.path());
    let store_dir = tmp.path().join("store");

    let index = LanceVectorIndex::open(&store_dir, "kb").await.expect("open");
    let builder = IndexBuilder::for_lance(index, fake()).with_progress(false);
    let q = FakeEmbedder::new(DIM).embed("demam").await.unwrap();

    builder.rebuild(&paths).await.expect("first");
    let first = builder.index().query_top_k(&q, 10).await.unwrap();
    builder.rebuild(&paths).await.expect("second");
    let second = builder.index().query_top_k(&q, 10).await.unwrap();

    assert_eq!(builder.index().count().await.unwrap(), 3, "no duplicates after rebuild");
    let texts = |hits: &[baymax_core::types::ScoredPassage]| {
        let mut v: Vec<(String, Attribution)> = hits.iter().map(|h| (h.passage.text.clone(), h.passage.metadata.clone())).collect();
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    };
    assert_eq!(texts(&first), texts(&second));
}

#[tokio::test]
async fn missing_and_empty_collections_return_nothing() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceVectorIndex::open(tmp.path(), "absent").await.expect("open");
    assert_eq!(index.count().await.unwrap(), 0);
    assert!(index.query_top_k(&[0.1; DIM], 4).await.unwrap().is_empty());

    let builder = IndexBuilder::for_lance(index, fake()).with_progress(false);
    let report = builder.rebuild_passages(Vec::new()).await.expect("empty build");
    assert!(report.is_empty());
    assert_eq!(builder.index().count().await.unwrap(), 0);
    assert_eq!(builder.index().dimension().await.unwrap(), None);
    assert!(builder.index().query_top_k(&[0.1; DIM], 4).await.unwrap().is_empty());
}

#[tokio::test]
async fn query_with_wrong_width_is_dimension_mismatch() {
    let tmp = TempDir::new().expect("tmp");
    let paths = write_corpus(tmp.path());
    let index = LanceVectorIndex::open(tmp.path(), "kb").await.expect("open");
    let builder = IndexBuilder::for_lance(index, fake()).with_progress(false);
    builder.rebuild(&paths).await.expect("rebuild");

    let err = builder.index().query_top_k(&[0.5; 8], 3).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: DIM, actual: 8 }), "got {err:?}");
}

/// Fails after `ok_batches` successful batches.
struct FlakyEmbedder {
    inner: FakeEmbedder,
    ok_batches: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }

    async fn embed(&self, text: &str) -> baymax_core::Result<Vec<f32>> { self.inner.embed(text).await }

    async fn embed_batch(&self, texts: &[String]) -> baymax_core::Result<Vec<Vec<f32>>> {
        use std::sync::atomic::Ordering;
        if self.ok_batches.load(Ordering::SeqCst) == 0 {
            return Err(Error::EmbeddingUnavailable("connection refused".into()));
        }
        self.ok_batches.fetch_sub(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

fn passages(n: usize) -> Vec<Passage> {
    (0..n)
        .map(|i| Passage { text: format!("passage nomor {i}"), metadata: Attribution { sources: "WHO".into(), ..Attribution::default() } })
        .collect()
}

#[tokio::test]
async fn embedding_failure_keeps_previous_collection() {
    let index = Arc::new(MemoryIndex::new());
    let good = IndexBuilder::new(SharedIndex(index.clone()), fake()).with_progress(false);
    good.rebuild_passages(passages(3)).await.expect("seed");

    let flaky = FlakyEmbedder { inner: FakeEmbedder::new(DIM), ok_batches: 1.into() };
    let bad = IndexBuilder::new(SharedIndex(index.clone()), Box::new(flaky)).with_batch_size(2).with_progress(false);
    let err = bad.rebuild_passages(passages(5)).await.unwrap_err();

    assert!(matches!(err, Error::EmbeddingUnavailable(_)));
    assert_eq!(index.count().await.unwrap(), 3, "old contents untouched");
}

#[tokio::test]
async fn second_build_while_locked_is_refused() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceVectorIndex::open(tmp.path(), "kb").await.expect("open");
    let lock_path = index.lock_path();
    let held = BuildLock::acquire(&lock_path).expect("first lock");

    let builder = IndexBuilder::for_lance(index, fake()).with_progress(false);
    let err = builder.rebuild_passages(passages(1)).await.unwrap_err();
    assert!(matches!(err, Error::BuildInProgress(ref p) if p == &lock_path), "got {err:?}");

    drop(held);
    builder.rebuild_passages(passages(1)).await.expect("lock released");
}

#[tokio::test]
async fn lock_file_left_by_a_crashed_build_does_not_block() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceVectorIndex::open(tmp.path(), "kb").await.expect("open");
    let lock_path = index.lock_path();
    // What a killed indexer leaves behind: the file with its pid, but no holder.
    std::fs::write(&lock_path, "4194304\n").expect("stale lock");

    let builder = IndexBuilder::for_lance(index, fake()).with_progress(false);
    let report = builder.rebuild_passages(passages(2)).await.expect("build over stale lock");
    assert_eq!(report.indexed, 2);

    let held = BuildLock::acquire(&lock_path).expect("free again");
    let pid = std::fs::read_to_string(held.path()).expect("read lock");
    assert_eq!(pid.trim(), std::process::id().to_string());
}

/// Lets two builders share one in-memory collection.
struct SharedIndex(Arc<MemoryIndex>);

#[async_trait]
impl VectorIndex for SharedIndex {
    async fn upsert_all(&self, entries: &[baymax_core::types::IndexEntry]) -> baymax_core::Result<usize> { self.0.upsert_all(entries).await }
    async fn query_top_k(&self, embedding: &[f32], k: usize) -> baymax_core::Result<Vec<baymax_core::types::ScoredPassage>> { self.0.query_top_k(embedding, k).await }
    async fn count(&self) -> baymax_core::Result<usize> { self.0.count().await }
    async fn dimension(&self) -> baymax_core::Result<Option<usize>> { self.0.dimension().await }
}
