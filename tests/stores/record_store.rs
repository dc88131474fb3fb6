use feed_cache::{CachedFeed, ItemRecord, RecordContext, RecordFeedStore, StoreError};

use crate::support::*;

fn sut() -> ((), RecordFeedStore) {
    ((), RecordFeedStore::in_memory())
}

feed_store_contract!(sut());

fn counts(store: &RecordFeedStore) -> (usize, usize) {
    store
        .context()
        .read(|view| (view.feed_count(), view.item_count()))
        .unwrap()
}

#[test]
fn save_leaves_exactly_one_feed_record() {
    let (_, sut) = sut();
    save(&sut, unique_items(), any_timestamp()).unwrap();
    save(&sut, unique_items(), any_timestamp()).unwrap();

    assert_eq!(counts(&sut), (1, unique_items().len()));
}

#[test]
fn delete_removes_feed_and_item_records() {
    let (_, sut) = sut();
    save(&sut, unique_items(), any_timestamp()).unwrap();
    delete(&sut).unwrap();

    assert_eq!(counts(&sut), (0, 0));
}

#[test]
fn save_fails_on_read_only_context() {
    let sut = RecordFeedStore::new(RecordContext::in_memory().read_only());

    assert!(matches!(
        save(&sut, unique_items(), any_timestamp()),
        Err(StoreError::WriteFailed(_))
    ));
    assert_eq!(retrieve(&sut), Ok(None));
}

#[test]
fn delete_fails_on_read_only_context() {
    let context = RecordContext::in_memory();
    let writer = RecordFeedStore::new(context.clone());
    let items = unique_items();
    let timestamp = any_timestamp();
    save(&writer, items.clone(), timestamp).unwrap();

    let sut = RecordFeedStore::new(context.read_only());

    assert!(matches!(delete(&sut), Err(StoreError::DeleteFailed(_))));
    assert_eq!(retrieve(&sut), Ok(Some(CachedFeed::new(items, timestamp))));
}

#[test]
fn retrieve_delivers_corrupted_on_missing_item_record() {
    let (_, sut) = sut();
    save(&sut, unique_items(), any_timestamp()).unwrap();

    let first_item = sut
        .context()
        .read(|view| view.feeds(1)[0].1.items[0])
        .unwrap();
    let mut tx = sut.context().transaction();
    tx.delete_item(first_item);
    tx.commit().unwrap();

    assert!(is_corrupted(&retrieve(&sut)));
}

#[test]
fn retrieve_delivers_corrupted_on_invalid_image_url() {
    let (_, sut) = sut();
    let mut tx = sut.context().transaction();
    tx.insert_feed(
        any_timestamp(),
        vec![ItemRecord {
            item_id: [1; 16],
            description: None,
            location: None,
            image_url: "not a url".into(),
        }],
    );
    tx.commit().unwrap();

    assert!(is_corrupted(&retrieve(&sut)));
}

#[test]
fn persistent_context_keeps_snapshot_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.records");
    let items = unique_items();
    let timestamp = any_timestamp();

    let first = RecordFeedStore::new(RecordContext::open(&path).unwrap());
    save(&first, items.clone(), timestamp).unwrap();
    drop(first);

    let second = RecordFeedStore::new(RecordContext::open(&path).unwrap());
    assert_eq!(retrieve(&second), Ok(Some(CachedFeed::new(items, timestamp))));
}

#[test]
fn persistent_context_save_fails_when_file_cannot_be_written() {
    let dir = tempfile::tempdir().unwrap();
    let sut = RecordFeedStore::new(
        RecordContext::open(dir.path().join("missing").join("feed.records")).unwrap(),
    );

    assert!(matches!(
        save(&sut, unique_items(), any_timestamp()),
        Err(StoreError::WriteFailed(_))
    ));
    assert_eq!(retrieve(&sut), Ok(None));
}
