use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DircullError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("no files found under {0}")]
    EmptyInventory(PathBuf),

    #[error("walk error: {0}")]
    Walk(String),

    #[error("failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("digest cache error: {0}")]
    Cache(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DircullError>;
