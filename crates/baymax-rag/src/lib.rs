//! Query-time pipeline: retrieve, assemble, generate.
//!
//! The constructors at the bottom wire everything from [`Settings`]; nothing
//! here holds process-wide state.

use baymax_core::config::Settings;
use baymax_core::Result;
use baymax_embed::get_default_embedder;
use baymax_vector::{IndexBuilder, LanceVectorIndex};

pub mod api;
pub mod assistant;
pub mod generate;
pub mod retriever;

pub use api::{AskRequest, AskResponse, ChatResponse};
pub use assistant::Assistant;
pub use generate::OpenAiGenerator;
pub use retriever::Retriever;

pub async fn open_index(settings: &Settings) -> Result<LanceVectorIndex> {
    LanceVectorIndex::open(&settings.data.persist_path(), &settings.data.collection).await
}

pub async fn open_retriever(settings: &Settings) -> Result<Retriever<LanceVectorIndex>> {
    let index = open_index(settings).await?;
    let embedder = get_default_embedder(&settings.embedding)?;
    Ok(Retriever::new(index, embedder))
}

pub async fn open_assistant(settings: &Settings) -> Result<Assistant<LanceVectorIndex>> {
    let generator = OpenAiGenerator::new(&settings.generation)?;
    let retriever = open_retriever(settings).await?;
    Ok(Assistant::new(retriever, Box::new(generator), settings.retrieval.top_k))
}

/// Index builder for the configured collection, holding its build lock.
pub async fn open_builder(settings: &Settings) -> Result<IndexBuilder<LanceVectorIndex>> {
    let index = open_index(settings).await?;
    let embedder = get_default_embedder(&settings.embedding)?;
    Ok(IndexBuilder::for_lance(index, embedder).with_batch_size(settings.embedding.batch_size))
}
