use std::sync::mpsc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use feed_cache::{FeedStore, LocalFeedItem, RetrievalResult, StoreError};
use url::Url;
use uuid::Uuid;

const WAIT: Duration = Duration::from_secs(5);

pub fn retrieve(store: &dyn FeedStore) -> RetrievalResult {
    let (tx, rx) = mpsc::channel();
    store.retrieve(Box::new(move |result| {
        let _ = tx.send(result);
    }));
    rx.recv_timeout(WAIT).expect("retrieval completion")
}

pub fn save(
    store: &dyn FeedStore,
    items: Vec<LocalFeedItem>,
    timestamp: DateTime<Utc>,
) -> Result<(), StoreError> {
    let (tx, rx) = mpsc::channel();
    store.save(
        items,
        timestamp,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    rx.recv_timeout(WAIT).expect("save completion")
}

pub fn delete(store: &dyn FeedStore) -> Result<(), StoreError> {
    let (tx, rx) = mpsc::channel();
    store.delete(Box::new(move |result| {
        let _ = tx.send(result);
    }));
    rx.recv_timeout(WAIT).expect("deletion completion")
}

pub fn unique_items() -> Vec<LocalFeedItem> {
    (0..3)
        .map(|n| LocalFeedItem {
            id: Uuid::new_v4(),
            description: (n != 1).then(|| format!("description {n}")),
            location: (n != 2).then(|| format!("location {n}")),
            image_url: Url::parse(&format!("https://image-{n}.example.com/pic.png")).unwrap(),
        })
        .collect()
}

pub fn any_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap() + chrono::Duration::nanoseconds(123_456_789)
}

pub fn is_corrupted(result: &RetrievalResult) -> bool {
    matches!(result, Err(StoreError::Corrupted(_)))
}
