use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::CollectionsApi;
use crate::error::{StoreError, StoreResult};
use crate::models::{CreateCollection, RemoteCollection, UpdateCollection};

/// In-memory backend for unit testing.
///
/// Records are held as raw JSON values so tests can seed any wire shape the
/// defensive mapper must tolerate. Each operation can be made to fail on
/// demand, and mutating calls are logged for assertions.
#[derive(Default)]
pub struct InMemoryCollectionsApi {
    records: Mutex<Vec<Value>>,
    calls: Mutex<CallLog>,
    fail: FailFlags,
}

#[derive(Default, Clone)]
pub struct CallLog {
    pub replace_properties: Vec<(String, Vec<String>)>,
    pub update_image: Vec<(String, Option<String>)>,
    pub update: Vec<String>,
    pub delete: Vec<String>,
}

#[derive(Default)]
struct FailFlags {
    list: AtomicBool,
    create: AtomicBool,
    update: AtomicBool,
    update_image: AtomicBool,
    replace_properties: AtomicBool,
    delete: AtomicBool,
}

fn injected() -> StoreError {
    StoreError::Api {
        status: 500,
        message: "injected failure".to_string(),
    }
}

impl InMemoryCollectionsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw wire payload as returned by the listing endpoint
    pub async fn seed(&self, record: Value) {
        self.records.lock().await.push(record);
    }

    pub async fn records(&self) -> Vec<Value> {
        self.records.lock().await.clone()
    }

    pub async fn calls(&self) -> CallLog {
        self.calls.lock().await.clone()
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail.list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail.create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail.update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update_image(&self, fail: bool) {
        self.fail.update_image.store(fail, Ordering::SeqCst);
    }

    pub fn fail_replace_properties(&self, fail: bool) {
        self.fail.replace_properties.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail.delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CollectionsApi for InMemoryCollectionsApi {
    async fn list(&self, _token: &str) -> StoreResult<Vec<RemoteCollection>> {
        if self.fail.list.load(Ordering::SeqCst) {
            return Err(injected());
        }

        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter_map(|record| serde_json::from_value(record.clone()).ok())
            .collect())
    }

    async fn create(&self, _token: &str, input: &CreateCollection) -> StoreResult<RemoteCollection> {
        if self.fail.create.load(Ordering::SeqCst) {
            return Err(injected());
        }

        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let record = json!({
            "id": Uuid::new_v4().to_string(),
            "title": input.title,
            "description": input.description,
            "image": Value::Null,
            "propertyIds": [],
            "createdAt": now,
            "updatedAt": now,
        });

        self.records.lock().await.push(record.clone());
        Ok(serde_json::from_value(record)?)
    }

    async fn update(&self, _token: &str, id: &str, patch: &UpdateCollection) -> StoreResult<()> {
        if self.fail.update.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.calls.lock().await.update.push(id.to_string());

        let mut records = self.records.lock().await;
        let record = find_record(records.as_mut_slice(), id)?;
        if let Some(title) = &patch.title {
            record.insert("title".to_string(), json!(title));
        }
        if let Some(description) = &patch.description {
            record.insert("description".to_string(), json!(description));
        }
        Ok(())
    }

    async fn update_image(&self, _token: &str, id: &str, image: Option<&str>) -> StoreResult<()> {
        if self.fail.update_image.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.calls
            .lock()
            .await
            .update_image
            .push((id.to_string(), image.map(str::to_string)));

        let mut records = self.records.lock().await;
        let record = find_record(records.as_mut_slice(), id)?;
        record.insert("image".to_string(), json!(image));
        Ok(())
    }

    async fn replace_properties(
        &self,
        _token: &str,
        id: &str,
        property_ids: &[String],
    ) -> StoreResult<()> {
        if self.fail.replace_properties.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.calls
            .lock()
            .await
            .replace_properties
            .push((id.to_string(), property_ids.to_vec()));

        let mut records = self.records.lock().await;
        let record = find_record(records.as_mut_slice(), id)?;
        record.insert("propertyIds".to_string(), json!(property_ids));
        Ok(())
    }

    async fn delete(&self, _token: &str, id: &str) -> StoreResult<()> {
        if self.fail.delete.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.calls.lock().await.delete.push(id.to_string());

        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|record| record.get("id").and_then(Value::as_str) != Some(id));
        if records.len() == before {
            return Err(StoreError::NotFound("Collection".to_string()));
        }
        Ok(())
    }
}

fn find_record<'a>(
    records: &'a mut [Value],
    id: &str,
) -> StoreResult<&'a mut serde_json::Map<String, Value>> {
    records
        .iter_mut()
        .find(|record| record.get("id").and_then(Value::as_str) == Some(id))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| StoreError::NotFound("Collection".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_list() {
        let api = InMemoryCollectionsApi::new();
        let input = CreateCollection {
            title: "Trip".to_string(),
            description: "".to_string(),
        };

        let created = api.create("t", &input).await.unwrap();
        assert!(created.id.is_some());

        let listed = api.list("t").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title.as_deref(), Some("Trip"));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let api = InMemoryCollectionsApi::new();
        api.fail_list(true);
        assert!(api.list("t").await.is_err());

        api.fail_list(false);
        assert!(api.list("t").await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_properties_logged() {
        let api = InMemoryCollectionsApi::new();
        api.seed(json!({ "id": "c1", "title": "A", "propertyIds": [] }))
            .await;

        api.replace_properties("t", "c1", &["p1".to_string()])
            .await
            .unwrap();

        let calls = api.calls().await;
        assert_eq!(
            calls.replace_properties,
            vec![("c1".to_string(), vec!["p1".to_string()])]
        );

        let listed = api.list("t").await.unwrap();
        assert_eq!(listed[0].clone().try_into_collection().unwrap().property_ids, vec!["p1"]);
    }
}
