mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{remote_fixture, TestStore};
use estate_collections::models::Collection;
use estate_collections::storage::BlobStore;
use estate_collections::{CollectionStore, STORAGE_KEY};

#[tokio::test]
async fn test_mutations_are_persisted() {
    let app = TestStore::anonymous();
    let collection = app.store.create_collection("Trip", "").await.unwrap();
    app.store
        .add_property_to_collection(&collection.id, "p0", None)
        .await;

    let blob = app.blobs.load(STORAGE_KEY).await.unwrap().unwrap();
    let persisted: Vec<Collection> = serde_json::from_str(&blob).unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].title, "Trip");
    assert_eq!(persisted[0].property_ids, vec!["p0"]);
}

#[tokio::test]
async fn test_rehydration_restores_previous_session() {
    let app = TestStore::anonymous();
    let collection = app.store.create_collection("Trip", "desc").await.unwrap();
    app.store
        .add_property_to_collection(&collection.id, "p1", Some("https://cdn/p1.jpg"))
        .await;

    // A fresh store instance over the same blob store (next app launch)
    let next = Arc::new(CollectionStore::new(
        app.api.clone(),
        app.blobs.clone(),
        app.credentials.clone(),
    ));
    next.clone().init().await.unwrap();

    let collections = next.get_collections().await;
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].id, collection.id);
    assert_eq!(collections[0].property_ids, vec!["p1"]);
    assert_eq!(collections[0].image.as_deref(), Some("https://cdn/p1.jpg"));
}

#[tokio::test]
async fn test_corrupt_blob_starts_empty() {
    let app = TestStore::anonymous();
    app.blobs.seed(STORAGE_KEY, "not-json{{{").await;

    app.store.clone().init().await.unwrap();

    assert!(app.store.get_collections().await.is_empty());
}

#[tokio::test]
async fn test_placeholder_records_scrubbed_on_rehydrate() {
    let app = TestStore::anonymous();
    let keep = Collection::new_local("Real", "");
    let mut seeded = vec![keep.clone(), Collection::new_local("Demo", "")];
    seeded[1].id = "mock-1".to_string();
    app.blobs
        .seed(STORAGE_KEY, &serde_json::to_string(&seeded).unwrap())
        .await;

    app.store.clone().init().await.unwrap();

    let collections = app.store.get_collections().await;
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].id, keep.id);

    // The scrub is written back so the fixture never resurfaces
    let blob = app.blobs.load(STORAGE_KEY).await.unwrap().unwrap();
    assert!(!blob.contains("mock-1"));
}

#[tokio::test]
async fn test_init_with_credential_triggers_background_fetch() {
    let app = TestStore::authenticated();
    app.api.seed(remote_fixture("c1", "Server", &["p1"])).await;

    app.store.clone().init().await.unwrap();

    // The refresh runs detached; poll until it lands
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if !app.store.get_collections().await.is_empty() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "background fetch never completed"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let collections = app.store.get_collections().await;
    assert_eq!(collections[0].id, "c1");
    app.store.close().await;
}

#[tokio::test]
async fn test_init_without_credential_stays_local() {
    let app = TestStore::anonymous();
    app.api.seed(remote_fixture("c1", "Server", &[])).await;

    app.store.clone().init().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(app.store.get_collections().await.is_empty());
}
