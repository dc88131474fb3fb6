//! RecordContext - a small transactional record database.
//!
//! Two tables: feed records and item records. A feed record owns an ordered
//! list of item ids. Reads go through [`RecordContext::read`]; every mutation
//! is staged on a [`Transaction`] and applied atomically by `commit`.
//!
//! An in-memory context keeps its tables only for its lifetime. A context
//! opened on a file rewrites that file (bitcode, write-then-rename) on every
//! commit and swaps the in-memory tables only after the file is in place.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RecordError;
use crate::store::replace::replace_file;

pub type RecordId = u64;

/// Top-level record: one cached feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub timestamp_secs: i64,
    pub timestamp_nanos: u32,
    /// Child item ids, in feed order.
    pub items: Vec<RecordId>,
}

impl FeedRecord {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp_secs, self.timestamp_nanos)
    }
}

/// Child record: one feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item_id: [u8; 16],
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    next_id: RecordId,
    feeds: BTreeMap<RecordId, FeedRecord>,
    items: BTreeMap<RecordId, ItemRecord>,
}

impl Tables {
    fn allocate(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::DeleteFeeds => {
                let feeds = std::mem::take(&mut self.feeds);
                for item in feeds.into_values().flat_map(|feed| feed.items) {
                    self.items.remove(&item);
                }
            }
            Op::DeleteItem(id) => {
                self.items.remove(&id);
            }
            Op::InsertFeed { timestamp, items } => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    let id = self.allocate();
                    self.items.insert(id, item);
                    ids.push(id);
                }
                let id = self.allocate();
                self.feeds.insert(
                    id,
                    FeedRecord {
                        timestamp_secs: timestamp.timestamp(),
                        timestamp_nanos: timestamp.timestamp_subsec_nanos(),
                        items: ids,
                    },
                );
            }
        }
    }
}

enum Op {
    DeleteFeeds,
    DeleteItem(RecordId),
    InsertFeed {
        timestamp: DateTime<Utc>,
        items: Vec<ItemRecord>,
    },
}

/// Read-only view of the tables, valid for the duration of a `read` call.
pub struct RecordView<'a> {
    tables: &'a Tables,
}

impl<'a> RecordView<'a> {
    /// Feed records in insertion order, at most `limit` of them.
    pub fn feeds(&self, limit: usize) -> Vec<(RecordId, &'a FeedRecord)> {
        self.tables
            .feeds
            .iter()
            .take(limit)
            .map(|(id, feed)| (*id, feed))
            .collect()
    }

    pub fn item(&self, id: RecordId) -> Option<&'a ItemRecord> {
        self.tables.items.get(&id)
    }

    pub fn feed_count(&self) -> usize {
        self.tables.feeds.len()
    }

    pub fn item_count(&self) -> usize {
        self.tables.items.len()
    }
}

/// Clone-friendly handle; clones share the same tables.
#[derive(Clone)]
pub struct RecordContext {
    tables: Arc<RwLock<Tables>>,
    backing: Option<Arc<PathBuf>>,
    read_only: bool,
}

impl Default for RecordContext {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl RecordContext {
    pub fn in_memory() -> Self {
        RecordContext {
            tables: Arc::new(RwLock::new(Tables::default())),
            backing: None,
            read_only: false,
        }
    }

    /// Open a context persisted at `path`, loading existing records if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let path = path.into();
        let tables = match fs::read(&path) {
            Ok(bytes) => {
                bitcode::deserialize(&bytes).map_err(|e| RecordError::Decode(e.to_string()))?
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Tables::default(),
            Err(err) => return Err(RecordError::Io(err)),
        };
        debug!(path = %path.display(), feeds = tables.feeds.len(), "opened record context");

        Ok(RecordContext {
            tables: Arc::new(RwLock::new(tables)),
            backing: Some(Arc::new(path)),
            read_only: false,
        })
    }

    /// A handle on the same tables that rejects every commit.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn path(&self) -> Option<&Path> {
        self.backing.as_deref().map(PathBuf::as_path)
    }

    pub fn read<T>(&self, f: impl FnOnce(&RecordView<'_>) -> T) -> Result<T, RecordError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| RecordError::Poisoned("read"))?;
        Ok(f(&RecordView { tables: &*tables }))
    }

    pub fn transaction(&self) -> Transaction<'_> {
        Transaction {
            context: self,
            ops: Vec::new(),
        }
    }

    fn persist(&self, tables: &Tables) -> Result<(), RecordError> {
        let Some(path) = self.backing.as_deref() else {
            return Ok(());
        };
        let bytes = bitcode::serialize(tables).map_err(|e| RecordError::Encode(e.to_string()))?;
        replace_file(path, &bytes)?;
        Ok(())
    }
}

/// Staged mutations. Nothing is visible until [`Transaction::commit`] succeeds;
/// dropping an uncommitted transaction discards it.
pub struct Transaction<'a> {
    context: &'a RecordContext,
    ops: Vec<Op>,
}

impl<'a> Transaction<'a> {
    /// Delete every feed record and the items it owns.
    pub fn delete_feeds(&mut self) -> &mut Self {
        self.ops.push(Op::DeleteFeeds);
        self
    }

    /// Delete a single item record, leaving any feed that references it untouched.
    pub fn delete_item(&mut self, id: RecordId) -> &mut Self {
        self.ops.push(Op::DeleteItem(id));
        self
    }

    /// Insert a brand-new feed record with its items.
    pub fn insert_feed(&mut self, timestamp: DateTime<Utc>, items: Vec<ItemRecord>) -> &mut Self {
        self.ops.push(Op::InsertFeed { timestamp, items });
        self
    }

    pub fn commit(self) -> Result<(), RecordError> {
        if self.context.read_only {
            return Err(RecordError::ReadOnly);
        }
        let mut tables = self
            .context
            .tables
            .write()
            .map_err(|_| RecordError::Poisoned("commit"))?;

        let mut staged = tables.clone();
        let applied = self.ops.len();
        for op in self.ops {
            staged.apply(op);
        }
        self.context.persist(&staged)?;
        *tables = staged;

        debug!(ops = applied, feeds = tables.feeds.len(), "record transaction committed");
        Ok(())
    }
}
