//! Domain types shared by the normalizer, the vector index and the retriever.

use serde::{Deserialize, Serialize};

pub type PassageId = String;
pub type Embedding = Vec<f32>;

/// Where a passage came from.
///
/// `sources` is always the flattened, comma+space joined form produced by
/// [`crate::sources::normalize_sources`]; the vector store only holds scalar
/// metadata, so a list never crosses this boundary. An empty string means
/// the passage carries no attribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub topic_id: Option<String>,
    pub topic_name: Option<String>,
    pub section: Option<String>,
    pub sources: String,
}

/// A unit of indexed knowledge. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub metadata: Attribution,
}

/// One row of a collection. `id` is only stable within one build generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: PassageId,
    pub embedding: Embedding,
    pub passage: Passage,
}

/// A passage returned by a top-k query. `score` is higher for closer matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: PassageId,
    pub score: f32,
    pub passage: Passage,
}

/// Ranked passages for one query, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredPassage>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.hits.iter().map(|h| &h.passage)
    }

    pub fn attributions(&self) -> impl Iterator<Item = &Attribution> {
        self.hits.iter().map(|h| &h.passage.metadata)
    }
}

/// What the last successful rebuild of a collection wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub embedder_id: String,
    pub dimension: usize,
    pub passage_count: usize,
    /// RFC 3339 timestamp.
    pub built_at: String,
}

/// Assigns `doc-0`, `doc-1`, ... in input order.
pub fn sequential_id(position: usize) -> PassageId {
    format!("doc-{position}")
}
