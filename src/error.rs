//! Error types for vidstash.

use thiserror::Error;

use crate::video::OwnerId;

/// Common error type for vidstash.
#[derive(Error, Debug)]
pub enum VideoError {
    /// Video name does not carry the required extension.
    #[error("invalid video name: {0}")]
    InvalidName(String),

    /// Owner identifier could not be parsed.
    #[error("invalid owner id: {0}")]
    InvalidOwner(String),

    /// Owner already has the maximum number of uploads in flight.
    #[error("owner {owner} already has {limit} uploads in flight")]
    QuotaExceeded {
        /// Owner that hit the limit.
        owner: OwnerId,
        /// Configured per-owner parallelism limit.
        limit: usize,
    },

    /// A video with the same name is uploading or already stored for the owner.
    #[error("video '{name}' already exists for owner {owner}")]
    DuplicateName {
        /// Owner of the colliding video.
        owner: OwnerId,
        /// Colliding name.
        name: String,
    },

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Failure talking to the remote drive.
    ///
    /// Never retried by the core and never masked as `NotFound`.
    #[error("transport error: {0}")]
    Transport(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A transfer task ended without producing a result.
    #[error("upload worker error: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for VideoError {
    fn from(e: tokio::task::JoinError) -> Self {
        VideoError::Worker(e.to_string())
    }
}

/// Result type alias for vidstash operations.
pub type Result<T> = std::result::Result<T, VideoError>;
