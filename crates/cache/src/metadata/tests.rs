//! Tests for the metadata store

use super::*;
use crate::entry::normalize_tags;
use chrono::Duration;
use std::path::PathBuf;
use tempfile::TempDir;

fn store() -> MetadataStore {
    MetadataStore::open_in_memory().unwrap()
}

#[tokio::test]
async fn test_access_increments_are_exact() {
    let store = store();
    let base = crate::entry::now_millis();

    let mut last = base;
    for i in 0..25 {
        last = base + Duration::milliseconds(i * 7);
        store.record_access("QmA", last).await.unwrap();
    }

    let entry = store.get("QmA").await.unwrap().unwrap();
    assert_eq!(entry.access_count, 25);
    assert_eq!(entry.last_accessed, last);
    assert_eq!(entry.name, UNKNOWN_NAME);
}

#[tokio::test]
async fn test_concurrent_access_has_no_lost_updates() {
    let store = store();
    let now = crate::entry::now_millis();
    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.record_access("QmHot", now).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.get("QmHot").await.unwrap().unwrap().access_count, 50);
}

#[tokio::test]
async fn test_set_favorite_creates_default_row() {
    let store = store();

    let entry = store.set_favorite("QmNew", true).await.unwrap();

    assert!(entry.is_favorite);
    assert_eq!(entry.cid, "QmNew");
    assert_eq!(entry.name, UNKNOWN_NAME);
    assert_eq!(entry.size, 0);
    assert_eq!(entry.access_count, 0);
    assert!(entry.mime_type.is_empty());
    assert!(entry.tags.is_empty());
    assert!(entry.local_path.is_none());
    assert!(entry.notes.is_empty());
    assert_eq!(store.get("QmNew").await.unwrap(), Some(entry));
}

#[tokio::test]
async fn test_set_favorite_keeps_other_fields() {
    let store = store();
    let mut entry = CacheEntry::new("QmA", "photo.jpg");
    entry.size = 2048;
    entry.access_count = 3;
    store.insert(entry).await.unwrap();

    let updated = store.set_favorite("QmA", true).await.unwrap();
    assert_eq!(updated.name, "photo.jpg");
    assert_eq!(updated.size, 2048);
    assert_eq!(updated.access_count, 3);

    let cleared = store.set_favorite("QmA", false).await.unwrap();
    assert!(!cleared.is_favorite);
}

#[tokio::test]
async fn test_insert_update_delete() {
    let store = store();
    let mut entry = CacheEntry::new("QmA", "a.png");
    entry.tags = normalize_tags(["cat", "pet"]);
    entry.local_path = Some(PathBuf::from("/tmp/cache/QmA"));
    store.insert(entry.clone()).await.unwrap();
    assert_eq!(store.get("QmA").await.unwrap(), Some(entry.clone()));

    entry.notes = "seen at the beach".to_string();
    assert!(store.update(entry.clone()).await.unwrap());
    assert!(!store.update(CacheEntry::new("QmMissing", "x")).await.unwrap());
    assert_eq!(store.get("QmA").await.unwrap().unwrap().notes, "seen at the beach");

    assert!(store.delete("QmA").await.unwrap());
    assert!(!store.delete("QmA").await.unwrap());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_raw_tags_are_normalized_on_write() {
    let store = store();
    let mut entry = CacheEntry::new("QmTags", "t.png");
    entry.tags = ["a,b", " c "].into_iter().map(String::from).collect();
    store.insert(entry.clone()).await.unwrap();

    let stored = store.get("QmTags").await.unwrap().unwrap();
    assert_eq!(stored.tags, normalize_tags(["a", "b", "c"]));

    entry.tags = ["x,y"].into_iter().map(String::from).collect();
    assert!(store.update(entry).await.unwrap());
    let stored = store.get("QmTags").await.unwrap().unwrap();
    assert_eq!(stored.tags, normalize_tags(["x", "y"]));
}

#[tokio::test]
async fn test_listing_order_and_favorites() {
    let store = store();
    let base = crate::entry::now_millis();
    store.record_access("QmOld", base).await.unwrap();
    store.record_access("QmNew", base + Duration::seconds(10)).await.unwrap();
    store.record_access("QmMid", base + Duration::seconds(5)).await.unwrap();
    store.set_favorite("QmMid", true).await.unwrap();

    let cids: Vec<String> = store.list_recent().await.unwrap().into_iter().map(|e| e.cid).collect();
    assert_eq!(cids, ["QmNew", "QmMid", "QmOld"]);

    let favorites = store.list_favorites().await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].cid, "QmMid");
    assert!(store.favorite_cids().await.unwrap().contains("QmMid"));
}

#[tokio::test]
async fn test_search_matches_name_and_tags() {
    let store = store();
    store.insert(CacheEntry::new("QmA", "Sunset.jpg")).await.unwrap();
    store.insert(CacheEntry::new("QmB", "receipt.pdf")).await.unwrap();
    store
        .set_tags("QmB", normalize_tags(["Tax", "2024"]))
        .await
        .unwrap();

    let by_name = store.search("sunset").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].cid, "QmA");

    let by_tag = store.search("tax").await.unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].cid, "QmB");

    assert!(store.search("nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_local_path_upsert_and_clear() {
    let store = store();
    let path = PathBuf::from("/var/cache/QmA");

    let entry = store.set_local_path("QmA", &path).await.unwrap();
    assert_eq!(entry.local_path.as_deref(), Some(path.as_path()));

    assert!(store.clear_local_path("QmA").await.unwrap());
    assert!(!store.clear_local_path("QmA").await.unwrap());

    store.set_local_path("QmB", &path).await.unwrap();
    store.set_local_path("QmC", &path).await.unwrap();
    assert_eq!(store.clear_all_local_paths().await.unwrap(), 2);
}

#[tokio::test]
async fn test_image_metadata_upsert_counts_access() {
    let store = store();
    let now = crate::entry::now_millis();
    let image = ImageMetadata {
        cid: "QmUp".to_string(),
        name: "upload.png".to_string(),
        size: 512,
        mime_type: "image/png".to_string(),
    };

    let created = store.upsert_image(image.clone(), now).await.unwrap();
    assert_eq!(created.access_count, 1);
    assert_eq!(created.mime_type, "image/png");

    store.set_favorite("QmUp", true).await.unwrap();
    let again = store.upsert_image(image, now).await.unwrap();
    assert_eq!(again.access_count, 2);
    assert!(again.is_favorite);
}

#[tokio::test]
async fn test_writes_bump_revision() {
    let store = store();
    let mut rx = store.subscribe();
    let before = *rx.borrow_and_update();

    store.set_notes("QmA", "hello").await.unwrap();

    assert!(rx.has_changed().unwrap());
    assert!(*rx.borrow_and_update() > before);
}

#[tokio::test]
async fn test_get_many_skips_missing() {
    let store = store();
    store.record_access("QmA", crate::entry::now_millis()).await.unwrap();
    store.record_access("QmC", crate::entry::now_millis()).await.unwrap();

    let found = store
        .get_many(vec!["QmC".into(), "QmB".into(), "QmA".into()])
        .await
        .unwrap();
    let cids: Vec<&str> = found.iter().map(|e| e.cid.as_str()).collect();
    assert_eq!(cids, ["QmC", "QmA"]);
}

#[tokio::test]
async fn test_file_database_persists_and_closes() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("nested").join("cid_metadata.sqlite");

    let store = MetadataStore::open(&db).await.unwrap();
    store.set_favorite("QmKeep", true).await.unwrap();
    store.close().unwrap();
    assert!(!store.is_open());

    let err = store.get("QmKeep").await.unwrap_err();
    assert!(matches!(err, CacheError::Persistence { .. }));

    let reopened = MetadataStore::open(&db).await.unwrap();
    assert!(reopened.get("QmKeep").await.unwrap().unwrap().is_favorite);
}
