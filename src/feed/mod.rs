//! Domain feed model shared by every feed source.

use url::Url;
use uuid::Uuid;

use crate::StoreError;

/// A single feed entry as callers see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: Uuid,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Url,
}

impl FeedItem {
    pub fn new(
        id: Uuid,
        description: Option<String>,
        location: Option<String>,
        image_url: Url,
    ) -> Self {
        Self {
            id,
            description,
            location,
            image_url,
        }
    }
}

pub type LoadFeedResult = Result<Vec<FeedItem>, StoreError>;

pub type LoadFeedCompletion = Box<dyn FnOnce(LoadFeedResult) + Send + 'static>;

/// Anything that can deliver a feed asynchronously.
///
/// The completion is invoked at most once, possibly on another thread.
pub trait FeedLoader {
    fn load(&self, completion: LoadFeedCompletion);
}
