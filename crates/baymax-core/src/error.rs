use std::path::PathBuf;

use thiserror::Error;

use crate::corpus::SkipReason;

#[derive(Debug, Error)]
pub enum Error {
    /// A knowledge file is missing or unreadable. Build-time only and never fatal on its own.
    #[error("Source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Embedding dimension mismatch: index holds {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Message cannot be empty")]
    EmptyQuestion,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Another build holds the lock at {0}")]
    BuildInProgress(PathBuf),

    #[error("Record skipped: {0}")]
    Skipped(SkipReason),
}

impl Error {
    pub fn index(err: impl std::fmt::Display) -> Self {
        Self::Index(err.to_string())
    }

    /// True for failures of a remote collaborator (embedding or generation).
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable(_) | Self::GenerationUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
