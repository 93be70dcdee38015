use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::api::{CollectionsApi, RestCollectionsApi};
use crate::auth::CredentialStore;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::models::{is_local_id, Collection, CreateCollection, UpdateCollection};
use crate::storage::{BlobStore, FileBlobStore};

/// Fixed key of the persisted collection list
pub const STORAGE_KEY: &str = "collections-storage";

// Id prefixes of seeded demo records; scrubbed on rehydration so stale
// fixtures never survive an app upgrade.
const PLACEHOLDER_ID_PREFIXES: &[&str] = &["test-", "mock-", "sample-"];

struct StoreState {
    collections: Vec<Collection>,
    loading: bool,
    last_error: Option<String>,
}

/// Single source of truth for the user's collections.
///
/// Mutations apply locally first (the UI re-renders immediately), then issue
/// a best-effort reconciliation call against the REST backend. Only the
/// add-member path compensates on sync failure; every other mutation treats
/// a failed sync as a logged, non-fatal event. Collections created without a
/// credential carry a `local-` id and never talk to the server.
///
/// All state sits behind one async mutex: reads during an in-flight sync
/// observe fully-applied optimistic state, never a half-applied one.
pub struct CollectionStore {
    state: Mutex<StoreState>,
    api: Arc<dyn CollectionsApi>,
    blobs: Arc<dyn BlobStore>,
    credentials: Arc<dyn CredentialStore>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl CollectionStore {
    pub fn new(
        api: Arc<dyn CollectionsApi>,
        blobs: Arc<dyn BlobStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            state: Mutex::new(StoreState {
                collections: Vec::new(),
                loading: false,
                last_error: None,
            }),
            api,
            blobs,
            credentials,
            refresh_task: Mutex::new(None),
        }
    }

    /// Wire up the production collaborators from configuration
    pub fn from_config(
        config: &Config,
        credentials: Arc<dyn CredentialStore>,
    ) -> StoreResult<Self> {
        let api = Arc::new(RestCollectionsApi::new(config)?);
        let blobs = Arc::new(FileBlobStore::new(&config.storage_dir));
        Ok(Self::new(api, blobs, credentials))
    }

    /// Rehydrate persisted state and, when a credential is already present,
    /// kick off a background fetch without blocking startup.
    ///
    /// A corrupt blob is logged and treated as empty; a missing one is the
    /// first-run case.
    pub async fn init(self: Arc<Self>) -> StoreResult<()> {
        let rehydrated = match self.blobs.load(STORAGE_KEY).await? {
            Some(blob) => match serde_json::from_str::<Vec<Collection>>(&blob) {
                Ok(collections) => collections,
                Err(err) => {
                    tracing::warn!(error = %err, "corrupt collections blob, starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let before = rehydrated.len();
        let collections: Vec<Collection> = rehydrated
            .into_iter()
            .filter(|c| !is_placeholder(&c.id))
            .collect();
        let scrubbed = collections.len() != before;

        {
            let mut state = self.state.lock().await;
            state.collections = collections;
        }
        if scrubbed {
            self.persist().await;
        }

        if self.credentials.token().await.is_some() {
            let store = Arc::clone(&self);
            let handle = tokio::spawn(async move {
                store.fetch_collections().await;
            });
            *self.refresh_task.lock().await = Some(handle);
        }

        Ok(())
    }

    /// Stop the background refresh, if one is still running
    pub async fn close(&self) {
        if let Some(handle) = self.refresh_task.lock().await.take() {
            handle.abort();
        }
    }

    /// Pull the authoritative listing and merge it into local state.
    ///
    /// Without a credential this is a silent no-op (local mode). Server
    /// records replace the previous server view wholesale; `local-` records
    /// are kept in front so offline-created data survives the fetch. A
    /// failure lands in `last_error` and leaves the list untouched.
    pub async fn fetch_collections(&self) {
        let Some(token) = self.credentials.token().await else {
            tracing::debug!("no credential, skipping collections fetch");
            return;
        };

        {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.last_error = None;
        }

        match self.api.list(&token).await {
            Ok(remote) => {
                let fetched: Vec<Collection> = remote
                    .into_iter()
                    .filter_map(|record| record.try_into_collection())
                    .collect();
                tracing::debug!(count = fetched.len(), "fetched collections");

                {
                    let mut state = self.state.lock().await;
                    let mut merged: Vec<Collection> = state
                        .collections
                        .iter()
                        .filter(|c| c.is_local_only())
                        .cloned()
                        .collect();
                    merged.extend(fetched);
                    state.collections = merged;
                    state.loading = false;
                }
                self.persist().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch collections");
                let mut state = self.state.lock().await;
                state.loading = false;
                state.last_error = Some(err.to_string());
            }
        }
    }

    /// Create a collection and put it at the head of the list.
    ///
    /// With a credential the record is born server-confirmed; without one a
    /// `local-` record is synthesized. Failures are recorded in `last_error`
    /// and returned, since callers typically navigate only on success.
    pub async fn create_collection(
        &self,
        title: &str,
        description: &str,
    ) -> StoreResult<Collection> {
        match self.credentials.token().await {
            Some(token) => {
                let input = CreateCollection {
                    title: title.trim().to_string(),
                    description: description.trim().to_string(),
                };

                match self.api.create(&token, &input).await {
                    Ok(remote) => {
                        let collection = remote.try_into_collection().ok_or_else(|| {
                            StoreError::Malformed("create response carried no id".to_string())
                        })?;

                        {
                            let mut state = self.state.lock().await;
                            state.collections.insert(0, collection.clone());
                        }
                        self.persist().await;
                        Ok(collection)
                    }
                    Err(err) => {
                        let mut state = self.state.lock().await;
                        state.last_error = Some(err.to_string());
                        Err(err)
                    }
                }
            }
            None => {
                let collection = Collection::new_local(title, description);
                {
                    let mut state = self.state.lock().await;
                    state.collections.insert(0, collection.clone());
                }
                self.persist().await;
                Ok(collection)
            }
        }
    }

    /// Rename/re-describe a collection. Optimistic; a failed sync is logged
    /// and never rolled back.
    pub async fn update_collection(
        &self,
        id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) {
        if title.is_none() && description.is_none() {
            return;
        }

        let found = {
            let mut state = self.state.lock().await;
            match state.collections.iter_mut().find(|c| c.id == id) {
                Some(collection) => {
                    if let Some(title) = title {
                        collection.title = title.trim().to_string();
                    }
                    if let Some(description) = description {
                        collection.description = description.trim().to_string();
                    }
                    collection.updated_at = OffsetDateTime::now_utc();
                    true
                }
                None => false,
            }
        };
        if !found {
            tracing::warn!(%id, "collection not found for update");
            return;
        }
        self.persist().await;

        if let Some(token) = self.sync_token(id).await {
            let patch = UpdateCollection {
                title: title.map(|t| t.trim().to_string()),
                description: description.map(|d| d.trim().to_string()),
            };
            if let Err(err) = self.api.update(&token, id, &patch).await {
                tracing::warn!(%id, error = %err, "collection update not synced");
            }
        }
    }

    /// Change the cover image. No-op when unchanged; sync failure (including
    /// a backend without the image field) is logged only.
    pub async fn update_collection_image(&self, id: &str, image: Option<&str>) {
        enum Outcome {
            Missing,
            Unchanged,
            Updated,
        }

        let outcome = {
            let mut state = self.state.lock().await;
            match state.collections.iter_mut().find(|c| c.id == id) {
                None => Outcome::Missing,
                Some(collection) if collection.image.as_deref() == image => Outcome::Unchanged,
                Some(collection) => {
                    collection.image = image.map(str::to_string);
                    collection.updated_at = OffsetDateTime::now_utc();
                    Outcome::Updated
                }
            }
        };

        match outcome {
            Outcome::Missing => {
                tracing::warn!(%id, "collection not found for image update");
                return;
            }
            Outcome::Unchanged => return,
            Outcome::Updated => {}
        }
        self.persist().await;

        if let Some(token) = self.sync_token(id).await {
            if let Err(err) = self.api.update_image(&token, id, image).await {
                tracing::warn!(%id, error = %err, "cover image not synced");
            }
        }
    }

    /// Remove a collection from the list. Optimistic; server deletion is
    /// attempted for server-confirmed records and its failure logged only.
    pub async fn delete_collection(&self, id: &str) {
        let found = {
            let mut state = self.state.lock().await;
            let before = state.collections.len();
            state.collections.retain(|c| c.id != id);
            state.collections.len() != before
        };
        if !found {
            tracing::warn!(%id, "collection not found for delete");
            return;
        }
        self.persist().await;

        if let Some(token) = self.sync_token(id).await {
            if let Err(err) = self.api.delete(&token, id).await {
                tracing::warn!(%id, error = %err, "collection delete not synced");
            }
        }
    }

    /// Add a property to a collection. Idempotent: an already-present id is
    /// a no-op. When the collection was empty and a cover hint is supplied,
    /// the hint becomes the cover image.
    ///
    /// This is the one mutation with rollback: if the membership sync fails,
    /// the append (and any cover adoption) is reverted, restoring the
    /// pre-optimistic state.
    pub async fn add_property_to_collection(
        &self,
        collection_id: &str,
        property_id: &str,
        property_image: Option<&str>,
    ) {
        struct AddPlan {
            snapshot: Vec<String>,
            adopted_cover: bool,
            previous_image: Option<String>,
            cover: Option<String>,
        }

        let plan = {
            let mut state = self.state.lock().await;
            let Some(collection) = state.collections.iter_mut().find(|c| c.id == collection_id)
            else {
                tracing::warn!(%collection_id, "collection not found for property add");
                return;
            };
            if collection.property_ids.iter().any(|p| p == property_id) {
                tracing::debug!(%collection_id, %property_id, "property already in collection");
                return;
            }

            let adopted_cover = collection.property_ids.is_empty()
                && collection.image.is_none()
                && property_image.is_some();
            let previous_image = collection.image.clone();

            collection.property_ids.push(property_id.to_string());
            if adopted_cover {
                collection.image = property_image.map(str::to_string);
            }
            collection.updated_at = OffsetDateTime::now_utc();

            AddPlan {
                snapshot: collection.property_ids.clone(),
                adopted_cover,
                previous_image,
                cover: collection.image.clone(),
            }
        };
        self.persist().await;

        let Some(token) = self.sync_token(collection_id).await else {
            return;
        };

        match self
            .api
            .replace_properties(&token, collection_id, &plan.snapshot)
            .await
        {
            Ok(()) => {
                if plan.adopted_cover {
                    if let Err(err) = self
                        .api
                        .update_image(&token, collection_id, plan.cover.as_deref())
                        .await
                    {
                        tracing::warn!(%collection_id, error = %err, "cover image not synced");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    %collection_id, %property_id, error = %err,
                    "membership sync failed, reverting add"
                );
                {
                    let mut state = self.state.lock().await;
                    if let Some(collection) =
                        state.collections.iter_mut().find(|c| c.id == collection_id)
                    {
                        collection.property_ids.retain(|p| p != property_id);
                        if plan.adopted_cover {
                            collection.image = plan.previous_image.clone();
                        }
                        collection.updated_at = OffsetDateTime::now_utc();
                    }
                }
                self.persist().await;
            }
        }
    }

    /// Remove a property from a collection. Optimistic; the cover image is
    /// reset when the membership empties. A failed sync is logged only; the
    /// local removal stands.
    pub async fn remove_property_from_collection(&self, collection_id: &str, property_id: &str) {
        let snapshot = {
            let mut state = self.state.lock().await;
            let Some(collection) = state.collections.iter_mut().find(|c| c.id == collection_id)
            else {
                tracing::warn!(%collection_id, "collection not found for property remove");
                return;
            };

            let before = collection.property_ids.len();
            collection.property_ids.retain(|p| p != property_id);
            if collection.property_ids.len() == before {
                tracing::debug!(%collection_id, %property_id, "property not in collection");
                return;
            }
            if collection.property_ids.is_empty() {
                collection.image = None;
            }
            collection.updated_at = OffsetDateTime::now_utc();
            collection.property_ids.clone()
        };
        self.persist().await;

        if let Some(token) = self.sync_token(collection_id).await {
            if let Err(err) = self
                .api
                .replace_properties(&token, collection_id, &snapshot)
                .await
            {
                tracing::warn!(%collection_id, %property_id, error = %err, "membership sync failed");
            }
        }
    }

    /// Empty a collection's membership and reset its cover. The emptied list
    /// is synced best-effort so the server view does not go stale.
    pub async fn clear_collection_properties(&self, collection_id: &str) {
        let found = {
            let mut state = self.state.lock().await;
            match state.collections.iter_mut().find(|c| c.id == collection_id) {
                Some(collection) => {
                    collection.property_ids.clear();
                    collection.image = None;
                    collection.updated_at = OffsetDateTime::now_utc();
                    true
                }
                None => false,
            }
        };
        if !found {
            tracing::warn!(%collection_id, "collection not found for clear");
            return;
        }
        self.persist().await;

        if let Some(token) = self.sync_token(collection_id).await {
            if let Err(err) = self.api.replace_properties(&token, collection_id, &[]).await {
                tracing::warn!(%collection_id, error = %err, "membership clear not synced");
            }
        }
    }

    /// Wipe the whole local list. No server call; used for local decluttering
    /// and test teardown.
    pub async fn clear_all_collections(&self) {
        {
            let mut state = self.state.lock().await;
            state.collections.clear();
        }
        self.persist().await;
    }

    pub async fn get_collection(&self, id: &str) -> Option<Collection> {
        let state = self.state.lock().await;
        state.collections.iter().find(|c| c.id == id).cloned()
    }

    pub async fn get_collections(&self) -> Vec<Collection> {
        self.state.lock().await.collections.clone()
    }

    pub async fn is_property_in_collection(&self, collection_id: &str, property_id: &str) -> bool {
        let state = self.state.lock().await;
        state
            .collections
            .iter()
            .find(|c| c.id == collection_id)
            .is_some_and(|c| c.property_ids.iter().any(|p| p == property_id))
    }

    pub async fn get_collection_property_ids(&self, collection_id: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .collections
            .iter()
            .find(|c| c.id == collection_id)
            .map(|c| c.property_ids.clone())
            .unwrap_or_default()
    }

    /// Last read/create failure message, for UI consumption
    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    /// Token for reconciling a specific record: `local-` records never sync
    async fn sync_token(&self, id: &str) -> Option<String> {
        if is_local_id(id) {
            return None;
        }
        self.credentials.token().await
    }

    /// Persist the current list; persistence failures are logged, never fatal
    async fn persist(&self) {
        let serialized = {
            let state = self.state.lock().await;
            serde_json::to_string(&state.collections)
        };
        match serialized {
            Ok(blob) => {
                if let Err(err) = self.blobs.save(STORAGE_KEY, &blob).await {
                    tracing::warn!(error = %err, "failed to persist collections");
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to serialize collections"),
        }
    }
}

fn is_placeholder(id: &str) -> bool {
    PLACEHOLDER_ID_PREFIXES
        .iter()
        .any(|prefix| id.starts_with(prefix))
}
