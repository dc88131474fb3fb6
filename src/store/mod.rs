//! Store backends: durable storage for exactly one cached feed snapshot.
//!
//! Every backend implements [`FeedStore`]. Operations never block the caller;
//! each completion runs exactly once, usually on a worker thread owned by the
//! backend.

mod file;
mod queue;
mod replace;
#[cfg(feature = "records")]
mod records;

use chrono::{DateTime, Utc};

use crate::cache::{CachedFeed, LocalFeedItem};
use crate::StoreError;

pub use file::{FileFeedStore, FORMAT_VERSION};
pub use queue::{Access, AccessQueue, DEFAULT_READERS};
#[cfg(feature = "records")]
pub use records::{
    FeedRecord, ItemRecord, RecordContext, RecordFeedStore, RecordId, RecordView, Transaction,
};

pub type RetrievalResult = Result<Option<CachedFeed>, StoreError>;
pub type RetrievalCompletion = Box<dyn FnOnce(RetrievalResult) + Send + 'static>;
pub type SaveCompletion = Box<dyn FnOnce(Result<(), StoreError>) + Send + 'static>;
pub type DeletionCompletion = Box<dyn FnOnce(Result<(), StoreError>) + Send + 'static>;

/// Durable storage for a single feed snapshot.
pub trait FeedStore: Send + Sync {
    /// Read the stored snapshot. `Ok(None)` when nothing is cached.
    fn retrieve(&self, completion: RetrievalCompletion);

    /// Replace any stored snapshot with `items` cached at `timestamp`.
    fn save(&self, items: Vec<LocalFeedItem>, timestamp: DateTime<Utc>, completion: SaveCompletion);

    /// Remove the stored snapshot. Deleting an empty store succeeds.
    fn delete(&self, completion: DeletionCompletion);
}
