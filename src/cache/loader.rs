//! Cache use cases on top of a [`FeedStore`]: save a fresh feed, load the
//! cached one, and clear a cache that has gone stale.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::feed::{FeedItem, FeedLoader, LoadFeedCompletion, LoadFeedResult};
use crate::store::FeedStore;
use crate::StoreError;

use super::local::{CachedFeed, LocalFeedItem};
use super::policy::CachePolicy;

pub type SaveResult = Result<(), StoreError>;
pub type ValidationResult = Result<(), StoreError>;

/// Supplier of the current instant, injected so policy decisions are reproducible.
pub type CurrentTime = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct LoaderCore<S: ?Sized> {
    store: Arc<S>,
    current_time: CurrentTime,
    policy: CachePolicy,
}

/// Orchestrates cache reads, writes and validation on top of a [`FeedStore`].
///
/// Completions handed to the store hold only a weak handle to the loader.
/// Once the loader is dropped, late store answers are discarded: no follow-up
/// store call is issued and the caller's completion never runs.
pub struct LocalFeedLoader<S: FeedStore + ?Sized + 'static> {
    core: Arc<LoaderCore<S>>,
}

impl<S: FeedStore + ?Sized + 'static> LocalFeedLoader<S> {
    pub fn new<F>(store: Arc<S>, current_time: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        LocalFeedLoader {
            core: Arc::new(LoaderCore {
                store,
                current_time: Arc::new(current_time),
                policy: CachePolicy::default(),
            }),
        }
    }

    /// Loader reading the system clock.
    pub fn with_system_clock(store: Arc<S>) -> Self {
        Self::new(store, Utc::now)
    }

    /// Replace the freshness policy. Answers still pending for the consumed
    /// loader are discarded, as for any dropped loader.
    pub fn with_policy(self, policy: CachePolicy) -> Self {
        LocalFeedLoader {
            core: Arc::new(LoaderCore {
                store: self.core.store.clone(),
                current_time: self.core.current_time.clone(),
                policy,
            }),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.core.store
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.core.policy
    }

    /// Replace the cached feed: delete the old snapshot, then insert the new one.
    ///
    /// A failed delete is forwarded and nothing is inserted.
    pub fn save<F>(&self, feed: Vec<FeedItem>, completion: F)
    where
        F: FnOnce(SaveResult) + Send + 'static,
    {
        let weak = Arc::downgrade(&self.core);
        self.core.store.delete(Box::new(move |deleted| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            match deleted {
                Ok(()) => LoaderCore::insert(&core, feed, completion),
                Err(err) => {
                    warn!(error = %err, "cache deletion failed, new feed not inserted");
                    completion(Err(err));
                }
            }
        }));
    }

    /// Deliver the cached feed if it is still fresh; an empty feed otherwise.
    pub fn load<F>(&self, completion: F)
    where
        F: FnOnce(LoadFeedResult) + Send + 'static,
    {
        let weak = Arc::downgrade(&self.core);
        self.core.store.retrieve(Box::new(move |retrieved| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            let result = match retrieved {
                Err(err) => Err(err),
                Ok(None) => Ok(Vec::new()),
                Ok(Some(cached)) if core.is_fresh(&cached) => Ok(cached.into_feed()),
                Ok(Some(cached)) => {
                    debug!(
                        timestamp = %cached.timestamp,
                        items = cached.items.len(),
                        "cached feed is stale, delivering empty feed"
                    );
                    Ok(Vec::new())
                }
            };
            drop(core);
            completion(result);
        }));
    }

    /// Clear the cache when it is stale or unreadable. Fresh and empty caches are left alone.
    pub fn validate_cache<F>(&self, completion: F)
    where
        F: FnOnce(ValidationResult) + Send + 'static,
    {
        let weak = Arc::downgrade(&self.core);
        self.core.store.retrieve(Box::new(move |retrieved| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            match retrieved {
                Err(err) => {
                    warn!(error = %err, "feed cache unreadable, clearing it");
                    LoaderCore::clear(&core, completion);
                }
                Ok(Some(cached)) if !core.is_fresh(&cached) => {
                    debug!(timestamp = %cached.timestamp, "feed cache expired, clearing it");
                    LoaderCore::clear(&core, completion);
                }
                Ok(_) => {
                    drop(core);
                    completion(Ok(()));
                }
            }
        }));
    }
}

impl<S: FeedStore + ?Sized + 'static> LoaderCore<S> {
    fn is_fresh(&self, cached: &CachedFeed) -> bool {
        self.policy.is_valid((self.current_time)(), cached.timestamp)
    }

    fn insert<F>(core: &Arc<Self>, feed: Vec<FeedItem>, completion: F)
    where
        F: FnOnce(SaveResult) + Send + 'static,
    {
        let items: Vec<LocalFeedItem> = feed.into_iter().map(LocalFeedItem::from).collect();
        let timestamp = (core.current_time)();
        debug!(items = items.len(), %timestamp, "caching feed");

        let weak = Arc::downgrade(core);
        core.store.save(
            items,
            timestamp,
            Box::new(move |saved| {
                if weak.upgrade().is_none() {
                    return;
                }
                completion(saved);
            }),
        );
    }

    fn clear<F>(core: &Arc<Self>, completion: F)
    where
        F: FnOnce(ValidationResult) + Send + 'static,
    {
        let weak = Arc::downgrade(core);
        core.store.delete(Box::new(move |deleted| {
            if weak.upgrade().is_none() {
                return;
            }
            completion(deleted);
        }));
    }
}

impl<S: FeedStore + ?Sized + 'static> FeedLoader for LocalFeedLoader<S> {
    fn load(&self, completion: LoadFeedCompletion) {
        LocalFeedLoader::load(self, completion);
    }
}
