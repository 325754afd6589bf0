use baymax_core::config::Config;
use baymax_core::traits::VectorIndex;
use baymax_vector::LanceVectorIndex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let store = LanceVectorIndex::open(&settings.data.persist_path(), &settings.data.collection).await?;
    let total = store.count().await?;
    let dim = store.dimension().await?;
    println!("collection '{}' at {}: rows={} dim={:?}", store.collection(), store.persist_dir().display(), total, dim);
    match store.build_info().await? {
        Some(info) => println!("built_at={} embedder={} passages={}", info.built_at, info.embedder_id, info.passage_count),
        None => println!("no build recorded"),
    }
    Ok(())
}
