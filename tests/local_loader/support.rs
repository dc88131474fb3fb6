use std::sync::{Arc, Mutex};

use chrono::{DateTime, Days, Duration, TimeZone, Utc};
use feed_cache::{
    CachePolicy, CachedFeed, CalendarZone, DeletionCompletion, FeedItem, FeedStore,
    LocalFeedItem, LocalFeedLoader, RetrievalCompletion, SaveCompletion, StoreError,
};
use url::Url;
use uuid::Uuid;

/// What the loader asked the store to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Delete,
    Save(Vec<LocalFeedItem>, DateTime<Utc>),
    Retrieve,
}

/// Store double that records requests and completes them only when told to.
#[derive(Default)]
pub struct FeedStoreSpy {
    received: Mutex<Vec<Received>>,
    deletions: Mutex<Vec<Option<DeletionCompletion>>>,
    saves: Mutex<Vec<Option<SaveCompletion>>>,
    retrievals: Mutex<Vec<Option<RetrievalCompletion>>>,
}

impl FeedStoreSpy {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn complete_deletion(&self, result: Result<(), StoreError>) {
        let completion = take(&self.deletions, 0, "deletion");
        completion(result);
    }

    pub fn complete_save(&self, result: Result<(), StoreError>) {
        let completion = take(&self.saves, 0, "save");
        completion(result);
    }

    pub fn complete_retrieval(&self, result: Result<Option<CachedFeed>, StoreError>) {
        let completion = take(&self.retrievals, 0, "retrieval");
        completion(result);
    }

    pub fn complete_retrieval_with_empty_cache(&self) {
        self.complete_retrieval(Ok(None));
    }

    pub fn complete_retrieval_with(&self, items: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) {
        self.complete_retrieval(Ok(Some(CachedFeed::new(items, timestamp))));
    }
}

fn take<T>(slots: &Mutex<Vec<Option<T>>>, index: usize, kind: &str) -> T {
    // Release the lock before the caller runs the completion; it may call back into the spy.
    let mut slots = slots.lock().unwrap();
    slots
        .get_mut(index)
        .and_then(Option::take)
        .unwrap_or_else(|| panic!("no pending {kind} at index {index}"))
}

impl FeedStore for FeedStoreSpy {
    fn retrieve(&self, completion: RetrievalCompletion) {
        self.received.lock().unwrap().push(Received::Retrieve);
        self.retrievals.lock().unwrap().push(Some(completion));
    }

    fn save(&self, items: Vec<LocalFeedItem>, timestamp: DateTime<Utc>, completion: SaveCompletion) {
        self.received
            .lock()
            .unwrap()
            .push(Received::Save(items, timestamp));
        self.saves.lock().unwrap().push(Some(completion));
    }

    fn delete(&self, completion: DeletionCompletion) {
        self.received.lock().unwrap().push(Received::Delete);
        self.deletions.lock().unwrap().push(Some(completion));
    }
}

pub type Captured<T> = Arc<Mutex<Vec<T>>>;

pub fn capture<T: Send + 'static>() -> (Captured<T>, impl FnOnce(T) + Send + 'static) {
    let captured: Captured<T> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    (captured, move |value| sink.lock().unwrap().push(value))
}

pub fn make_sut(now: DateTime<Utc>) -> (LocalFeedLoader<FeedStoreSpy>, Arc<FeedStoreSpy>) {
    let store = Arc::new(FeedStoreSpy::default());
    let sut = LocalFeedLoader::new(store.clone(), move || now)
        .with_policy(CachePolicy::new().with_zone(CalendarZone::Utc));
    (sut, store)
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap()
}

pub fn max_age_ago(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Days::new(7)
}

pub fn seconds(n: i64) -> Duration {
    Duration::seconds(n)
}

pub fn unique_item() -> FeedItem {
    FeedItem::new(
        Uuid::new_v4(),
        Some("any description".into()),
        Some("any location".into()),
        Url::parse("https://any-url.com").unwrap(),
    )
}

/// The same two items as the caller sees them and as the store persists them.
pub fn unique_feed() -> (Vec<FeedItem>, Vec<LocalFeedItem>) {
    let models = vec![unique_item(), unique_item()];
    let local = models.iter().cloned().map(LocalFeedItem::from).collect();
    (models, local)
}

pub fn any_error() -> StoreError {
    StoreError::Corrupted("any error".into())
}
