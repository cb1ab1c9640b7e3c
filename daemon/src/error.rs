use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors crossing the manager boundary. Every operation the UI can reach
/// returns one of these instead of panicking or bubbling raw io errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("server not found: {0}")]
    ServerNotFound(Uuid),

    #[error("invalid server config: {0}")]
    Validation(String),

    #[error("launch artifact missing: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("server not running: {0}")]
    NotRunning(Uuid),

    #[error("failed to launch process: {0}")]
    Launch(#[source] std::io::Error),

    #[error("path escapes server root: {0}")]
    PathDenied(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persistence error: {0}")]
    Persist(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
