//! Persisted feed model, kept apart from [`FeedItem`] so stores never depend
//! on the caller-facing type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::feed::FeedItem;

/// Persisted counterpart of [`FeedItem`]. Only stores produce or consume it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFeedItem {
    pub id: Uuid,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Url,
}

impl From<FeedItem> for LocalFeedItem {
    fn from(item: FeedItem) -> Self {
        LocalFeedItem {
            id: item.id,
            description: item.description,
            location: item.location,
            image_url: item.image_url,
        }
    }
}

impl From<LocalFeedItem> for FeedItem {
    fn from(item: LocalFeedItem) -> Self {
        FeedItem {
            id: item.id,
            description: item.description,
            location: item.location,
            image_url: item.image_url,
        }
    }
}

/// The single snapshot a store holds: ordered items plus the moment they were cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFeed {
    pub items: Vec<LocalFeedItem>,
    pub timestamp: DateTime<Utc>,
}

impl CachedFeed {
    pub fn new(items: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> Self {
        CachedFeed { items, timestamp }
    }

    pub fn into_feed(self) -> Vec<FeedItem> {
        self.items.into_iter().map(FeedItem::from).collect()
    }
}
