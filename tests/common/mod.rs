#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use estate_collections::api::InMemoryCollectionsApi;
use estate_collections::auth::MemoryCredentialStore;
use estate_collections::storage::MemoryBlobStore;
use estate_collections::CollectionStore;

/// Store wired to in-memory collaborators, with handles kept for assertions
pub struct TestStore {
    pub store: Arc<CollectionStore>,
    pub api: Arc<InMemoryCollectionsApi>,
    pub blobs: Arc<MemoryBlobStore>,
    pub credentials: Arc<MemoryCredentialStore>,
}

impl TestStore {
    pub fn authenticated() -> Self {
        Self::build(Some("jwt-test"))
    }

    pub fn anonymous() -> Self {
        Self::build(None)
    }

    fn build(token: Option<&str>) -> Self {
        init_tracing();

        let api = Arc::new(InMemoryCollectionsApi::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let credentials = Arc::new(match token {
            Some(token) => MemoryCredentialStore::with_token(token),
            None => MemoryCredentialStore::new(),
        });
        let store = Arc::new(CollectionStore::new(
            api.clone(),
            blobs.clone(),
            credentials.clone(),
        ));

        Self {
            store,
            api,
            blobs,
            credentials,
        }
    }
}

/// Wire payload in the backend's canonical shape
pub fn remote_fixture(id: &str, title: &str, property_ids: &[&str]) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "image": Value::Null,
        "propertyIds": property_ids,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z",
    })
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
