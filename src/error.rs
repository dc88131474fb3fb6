use std::io;

use thiserror::Error;

/// Failure kinds reported by a [`FeedStore`](crate::FeedStore).
///
/// Carries rendered messages rather than source errors so a single failure can
/// be cloned and forwarded verbatim through the loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Persisted bytes or records exist but cannot be decoded.
    #[error("feed cache is corrupted: {0}")]
    Corrupted(String),

    /// The medium rejected a save.
    #[error("failed to write feed cache: {0}")]
    WriteFailed(String),

    /// The medium rejected a delete.
    #[error("failed to delete feed cache: {0}")]
    DeleteFailed(String),

    /// The medium holds a snapshot that could not be read.
    #[error("failed to read feed cache: {0}")]
    ReadFailed(String),

    /// The store can no longer service requests (poisoned lock, closed queue).
    #[error("feed store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a [`RecordContext`](crate::RecordContext).
#[cfg(feature = "records")]
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record context is read-only")]
    ReadOnly,

    #[error("record context lock poisoned during {0}")]
    Poisoned(&'static str),

    #[error("record file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode records: {0}")]
    Encode(String),

    #[error("failed to decode records: {0}")]
    Decode(String),
}

/// Errors raised while reading a [`CacheConfig`](crate::CacheConfig) or
/// composing the store it describes.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cache configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[cfg(feature = "records")]
    #[error("failed to open record store: {0}")]
    Records(#[from] RecordError),

    #[error("cache configuration requires the `{0}` feature")]
    FeatureDisabled(&'static str),
}

pub(crate) fn describe(err: &io::Error) -> String {
    format!("{} ({:?})", err, err.kind())
}
