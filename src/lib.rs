//! Local feed cache for content feed clients.
//!
//! - [`CachePolicy`] decides whether a cached snapshot is still fresh.
//! - [`FeedStore`] persists exactly one snapshot; [`FileFeedStore`] and
//!   [`RecordFeedStore`] are interchangeable backends.
//! - [`LocalFeedLoader`] sequences store calls for `save`, `load` and
//!   `validate_cache`, and drops late store answers once it is gone.

mod cache;
mod config;
mod error;
mod feed;
mod store;

pub use cache::{
    CachePolicy, CachedFeed, CalendarZone, CurrentTime, LocalFeedItem, LocalFeedLoader,
    SaveResult, ValidationResult, DEFAULT_MAX_AGE_DAYS,
};
pub use config::{CacheConfig, StoreConfig};
#[cfg(feature = "records")]
pub use error::RecordError;
pub use error::{ConfigError, StoreError};
pub use feed::{FeedItem, FeedLoader, LoadFeedCompletion, LoadFeedResult};
pub use store::{
    Access, AccessQueue, DeletionCompletion, FeedStore, FileFeedStore, RetrievalCompletion,
    RetrievalResult, SaveCompletion, DEFAULT_READERS, FORMAT_VERSION,
};
#[cfg(feature = "records")]
pub use store::{
    FeedRecord, ItemRecord, RecordContext, RecordFeedStore, RecordId, RecordView, Transaction,
};
