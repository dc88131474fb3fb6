//! Single-file store: the whole snapshot serialized as one JSON document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::cache::{CachedFeed, LocalFeedItem};
use crate::error::describe;
use crate::StoreError;

use super::queue::AccessQueue;
use super::replace::replace_file;
use super::{DeletionCompletion, FeedStore, RetrievalCompletion, SaveCompletion};

/// Version tag written into every snapshot document.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoredFeed {
    version: u32,
    items: Vec<StoredItem>,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct StoredItem {
    id: Uuid,
    description: Option<String>,
    location: Option<String>,
    image_url: Url,
}

impl From<LocalFeedItem> for StoredItem {
    fn from(item: LocalFeedItem) -> Self {
        StoredItem {
            id: item.id,
            description: item.description,
            location: item.location,
            image_url: item.image_url,
        }
    }
}

impl From<StoredItem> for LocalFeedItem {
    fn from(item: StoredItem) -> Self {
        LocalFeedItem {
            id: item.id,
            description: item.description,
            location: item.location,
            image_url: item.image_url,
        }
    }
}

/// Feed store persisting the snapshot to one file.
///
/// Reads run concurrently; saves and deletes are barriers executed one at a
/// time in submission order. A save writes a sibling temporary file and
/// renames it over the target, so readers see either the old or the new
/// snapshot. If the process dies before the rename the old snapshot survives;
/// a leftover temporary file is overwritten by the next save.
pub struct FileFeedStore {
    path: Arc<PathBuf>,
    queue: AccessQueue,
}

impl FileFeedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileFeedStore {
            path: Arc::new(path.into()),
            queue: AccessQueue::new("feed-file-store"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedStore for FileFeedStore {
    fn retrieve(&self, completion: RetrievalCompletion) {
        let path = self.path.clone();
        self.queue.shared(move |admitted| {
            completion(admitted.and_then(|()| read_snapshot(&path)));
        });
    }

    fn save(&self, items: Vec<LocalFeedItem>, timestamp: DateTime<Utc>, completion: SaveCompletion) {
        let path = self.path.clone();
        self.queue.exclusive(move |admitted| {
            completion(admitted.and_then(|()| write_snapshot(&path, items, timestamp)));
        });
    }

    fn delete(&self, completion: DeletionCompletion) {
        let path = self.path.clone();
        self.queue.exclusive(move |admitted| {
            completion(admitted.and_then(|()| remove_snapshot(&path)));
        });
    }
}

fn read_snapshot(path: &Path) -> Result<Option<CachedFeed>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no cached feed on disk");
            return Ok(None);
        }
        Err(err) => return Err(StoreError::ReadFailed(describe(&err))),
    };

    let stored = decode(&bytes)?;
    debug!(path = %path.display(), items = stored.items.len(), "read cached feed");
    Ok(Some(CachedFeed::new(
        stored.items.into_iter().map(LocalFeedItem::from).collect(),
        stored.timestamp,
    )))
}

fn decode(bytes: &[u8]) -> Result<StoredFeed, StoreError> {
    let stored: StoredFeed =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupted(e.to_string()))?;
    if stored.version != FORMAT_VERSION {
        return Err(StoreError::Corrupted(format!(
            "unsupported snapshot format version {}",
            stored.version
        )));
    }
    Ok(stored)
}

fn encode(items: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> Result<Vec<u8>, StoreError> {
    let stored = StoredFeed {
        version: FORMAT_VERSION,
        items: items.into_iter().map(StoredItem::from).collect(),
        timestamp,
    };
    serde_json::to_vec(&stored).map_err(|e| StoreError::WriteFailed(e.to_string()))
}

fn write_snapshot(
    path: &Path,
    items: Vec<LocalFeedItem>,
    timestamp: DateTime<Utc>,
) -> Result<(), StoreError> {
    let count = items.len();
    let bytes = encode(items, timestamp)?;
    replace_file(path, &bytes).map_err(|err| StoreError::WriteFailed(describe(&err)))?;

    debug!(path = %path.display(), items = count, "cached feed written");
    Ok(())
}

fn remove_snapshot(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "cached feed deleted");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StoreError::DeleteFailed(describe(&err))),
    }
}
