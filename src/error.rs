use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Board not initialized: no snapshot has been deserialized yet")]
    NotInitialized,

    #[error("Unknown facet: {0}")]
    UnknownFacet(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
