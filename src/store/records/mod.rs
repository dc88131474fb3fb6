//! Structured-record store: the snapshot lives as one feed record with an
//! ordered collection of item records in a [`RecordContext`].

mod context;

use chrono::{DateTime, Utc};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::cache::{CachedFeed, LocalFeedItem};
use crate::error::RecordError;
use crate::StoreError;

use super::queue::AccessQueue;
use super::{DeletionCompletion, FeedStore, RetrievalCompletion, SaveCompletion};

pub use context::{FeedRecord, ItemRecord, RecordContext, RecordId, RecordView, Transaction};

/// Feed store over a [`RecordContext`].
///
/// Fetches run concurrently; each save or delete is a single transaction,
/// committed one at a time in submission order. Every save builds a fresh
/// feed record after deleting the old ones, so a crash-free save never leaves
/// more than one feed record behind.
pub struct RecordFeedStore {
    context: RecordContext,
    queue: AccessQueue,
}

impl RecordFeedStore {
    pub fn new(context: RecordContext) -> Self {
        RecordFeedStore {
            context,
            queue: AccessQueue::new("feed-record-store"),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(RecordContext::in_memory())
    }

    pub fn context(&self) -> &RecordContext {
        &self.context
    }
}

impl FeedStore for RecordFeedStore {
    fn retrieve(&self, completion: RetrievalCompletion) {
        let context = self.context.clone();
        self.queue.shared(move |admitted| {
            completion(admitted.and_then(|()| fetch(&context)));
        });
    }

    fn save(&self, items: Vec<LocalFeedItem>, timestamp: DateTime<Utc>, completion: SaveCompletion) {
        let context = self.context.clone();
        self.queue.exclusive(move |admitted| {
            let result = admitted.and_then(|()| {
                let count = items.len();
                let mut tx = context.transaction();
                tx.delete_feeds()
                    .insert_feed(timestamp, items.into_iter().map(to_record).collect());
                tx.commit()
                    .map_err(|err| StoreError::WriteFailed(err.to_string()))?;
                debug!(items = count, "cached feed committed");
                Ok(())
            });
            completion(result);
        });
    }

    fn delete(&self, completion: DeletionCompletion) {
        let context = self.context.clone();
        self.queue.exclusive(move |admitted| {
            let result = admitted.and_then(|()| {
                let mut tx = context.transaction();
                tx.delete_feeds();
                tx.commit()
                    .map_err(|err| StoreError::DeleteFailed(err.to_string()))
            });
            completion(result);
        });
    }
}

fn fetch(context: &RecordContext) -> Result<Option<CachedFeed>, StoreError> {
    context
        .read(|view| {
            let Some((id, feed)) = view.feeds(1).into_iter().next() else {
                return Ok(None);
            };
            let timestamp = feed.timestamp().ok_or_else(|| {
                StoreError::Corrupted(format!("feed record {id} has an invalid timestamp"))
            })?;
            let items = feed
                .items
                .iter()
                .map(|item_id| {
                    let record = view.item(*item_id).ok_or_else(|| {
                        StoreError::Corrupted(format!(
                            "feed record {id} references missing item {item_id}"
                        ))
                    })?;
                    from_record(record)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(CachedFeed::new(items, timestamp)))
        })
        .map_err(|err| match err {
            RecordError::Poisoned(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::ReadFailed(other.to_string()),
        })?
}

fn to_record(item: LocalFeedItem) -> ItemRecord {
    ItemRecord {
        item_id: item.id.into_bytes(),
        description: item.description,
        location: item.location,
        image_url: item.image_url.into(),
    }
}

fn from_record(record: &ItemRecord) -> Result<LocalFeedItem, StoreError> {
    let image_url = Url::parse(&record.image_url)
        .map_err(|e| StoreError::Corrupted(format!("invalid image url: {e}")))?;
    Ok(LocalFeedItem {
        id: Uuid::from_bytes(record.item_id),
        description: record.description.clone(),
        location: record.location.clone(),
        image_url,
    })
}
