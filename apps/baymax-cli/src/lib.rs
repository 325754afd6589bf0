//! Pieces shared by the `baymax` and `baymax-indexer` binaries.

use std::path::PathBuf;

use clap::Args;
use tracing::info;
use tracing_subscriber::EnvFilter;

use baymax_core::config::{Config, Settings};
use baymax_core::corpus::{CorpusNormalizer, SkipPolicy};
use baymax_core::traits::VectorIndex;
use baymax_vector::BuildReport;

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

pub fn load_settings() -> anyhow::Result<Settings> {
    Config::load()?.settings()
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Structured knowledge file (overrides data.kb_file).
    #[arg(long)]
    pub kb_file: Option<PathBuf>,

    /// Pre-chunked knowledge file (overrides data.mb_file).
    #[arg(long)]
    pub mb_file: Option<PathBuf>,

    /// Target collection (overrides data.collection).
    #[arg(long)]
    pub collection: Option<String>,

    /// Fail on the first malformed record instead of skipping it.
    #[arg(long)]
    pub strict: bool,
}

impl BuildArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(p) = &self.kb_file {
            settings.data.kb_file = p.display().to_string();
        }
        if let Some(p) = &self.mb_file {
            settings.data.mb_file = p.display().to_string();
        }
        if let Some(c) = &self.collection {
            settings.data.collection = c.clone();
        }
    }
}

/// Rebuilds the configured collection from both knowledge files. The builder
/// logs the summary line.
pub async fn run_build(mut settings: Settings, args: &BuildArgs) -> anyhow::Result<BuildReport> {
    args.apply(&mut settings);
    settings.validate()?;
    let policy = if args.strict { SkipPolicy::Fail } else { SkipPolicy::Skip };
    let builder = baymax_rag::open_builder(&settings).await?.with_normalizer(CorpusNormalizer::with_policy(policy));
    let report = builder.rebuild(&settings.data.corpus_paths()).await?;
    if !report.skipped.is_empty() {
        info!("skipped {} malformed records", report.skipped.len());
    }
    Ok(report)
}

pub async fn print_status(settings: &Settings) -> anyhow::Result<()> {
    let index = baymax_rag::open_index(settings).await?;
    println!("collection: {}", index.collection());
    println!("location:   {}", index.persist_dir().display());
    println!("passages:   {}", index.count().await?);
    match index.dimension().await? {
        Some(d) => println!("dimension:  {d}"),
        None => println!("dimension:  -"),
    }
    match index.build_info().await? {
        Some(info) => {
            println!("embedder:   {}", info.embedder_id);
            println!("built at:   {}", info.built_at);
        }
        None => println!("no build recorded"),
    }
    Ok(())
}
