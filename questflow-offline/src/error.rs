use std::path::PathBuf;

/// Error type for key-value storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store refused the operation (used by `MemoryStore` to simulate a full disk).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Key '{0}' cannot be used as a file name")]
    InvalidKey(String),
}

/// Error type for offline queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stored data could not be decoded. The queue refuses to overwrite it.
    #[error("Stored data under '{key}' is corrupt: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not encode queue: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Record '{0}' is already queued")]
    Duplicate(String),
}

/// Error type for a single delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The sink refused or never received the submission.
    #[error("Submission failed: {0}")]
    Submission(#[source] anyhow::Error),

    /// The submission went through but the queue could not record it.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Error type for loading a `SyncConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
