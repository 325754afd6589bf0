use baymax_core::config::Config;
use baymax_core::traits::Embedder;
use baymax_embed::get_default_embedder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let embedder = get_default_embedder(&settings.embedding)?;
    let texts = vec!["Apa gejala demam?".to_string(), "Minum air putih cukup".to_string()];
    let embs = embedder.embed_batch(&texts).await?;
    println!("id={} B={} dim={}", embedder.embedder_id(), embs.len(), embs.first().map_or(0, Vec::len));
    Ok(())
}
