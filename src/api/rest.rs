use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use crate::api::CollectionsApi;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::models::{CreateCollection, RemoteCollection, UpdateCollection};

/// REST client for the marketplace backend
pub struct RestCollectionsApi {
    client: Client,
    base_url: String,
}

impl RestCollectionsApi {
    pub fn new(config: &Config) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn collections_url(&self) -> String {
        format!("{}/collections", self.base_url)
    }

    fn collection_url(&self, id: &str) -> String {
        format!("{}/collections/{id}", self.base_url)
    }

    async fn into_json(response: Response) -> StoreResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    async fn check_status(response: Response) -> StoreResult<()> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Unwrap the listing from the envelope variants the backend has shipped:
/// `{success, data}`, `{data: [...]}`, `{data: {data: [...]}}`, bare array.
fn unwrap_listing(value: Value) -> StoreResult<Vec<RemoteCollection>> {
    let items = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(items)) => Value::Array(items),
            Some(Value::Object(mut inner)) => match inner.remove("data") {
                Some(Value::Array(items)) => Value::Array(items),
                _ => Value::Array(Vec::new()),
            },
            _ => Value::Array(Vec::new()),
        },
        _ => Value::Array(Vec::new()),
    };

    Ok(serde_json::from_value(items)?)
}

/// Unwrap a single entity, enveloped as `{data: <entity>}` or returned bare
fn unwrap_entity(value: Value) -> StoreResult<RemoteCollection> {
    let entity = match value {
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(inner @ Value::Object(_)) => inner,
            _ => Value::Object(envelope),
        },
        other => other,
    };

    Ok(serde_json::from_value(entity)?)
}

#[async_trait]
impl CollectionsApi for RestCollectionsApi {
    async fn list(&self, token: &str) -> StoreResult<Vec<RemoteCollection>> {
        let response = self
            .client
            .get(self.collections_url())
            .bearer_auth(token)
            .send()
            .await?;

        unwrap_listing(Self::into_json(response).await?)
    }

    async fn create(&self, token: &str, input: &CreateCollection) -> StoreResult<RemoteCollection> {
        // The backend accepted `title` in some revisions and `name` in
        // others, and requires an initial properties array; send all three.
        let payload = json!({
            "title": input.title,
            "name": input.title,
            "description": input.description,
            "image": Value::Null,
            "properties": [],
        });

        let response = self
            .client
            .post(self.collections_url())
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        unwrap_entity(Self::into_json(response).await?)
    }

    async fn update(&self, token: &str, id: &str, patch: &UpdateCollection) -> StoreResult<()> {
        let response = self
            .client
            .patch(self.collection_url(id))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn update_image(&self, token: &str, id: &str, image: Option<&str>) -> StoreResult<()> {
        let response = self
            .client
            .patch(self.collection_url(id))
            .bearer_auth(token)
            .json(&json!({ "image": image }))
            .send()
            .await?;

        // Some backend deployments never shipped the image field; treat a
        // missing endpoint as a soft condition, not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(%id, "image endpoint missing, skipping cover sync");
            return Ok(());
        }

        Self::check_status(response).await
    }

    async fn replace_properties(
        &self,
        token: &str,
        id: &str,
        property_ids: &[String],
    ) -> StoreResult<()> {
        let response = self
            .client
            .patch(self.collection_url(id))
            .bearer_auth(token)
            .json(&json!({ "properties": property_ids }))
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn delete(&self, token: &str, id: &str) -> StoreResult<()> {
        let response = self
            .client
            .delete(self.collection_url(id))
            .bearer_auth(token)
            .send()
            .await?;

        Self::check_status(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_bare_array() {
        let items = unwrap_listing(json!([{ "id": "c1", "title": "A" }])).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_unwrap_success_envelope() {
        let items =
            unwrap_listing(json!({ "success": true, "data": [{ "id": "c1" }] })).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_unwrap_nested_data_envelope() {
        let items =
            unwrap_listing(json!({ "data": { "data": [{ "id": "c1" }, { "id": "c2" }] } }))
                .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_unwrap_unknown_shape_is_empty() {
        assert!(unwrap_listing(json!({ "message": "ok" })).unwrap().is_empty());
        assert!(unwrap_listing(json!("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_unwrap_enveloped_entity() {
        let entity = unwrap_entity(json!({ "data": { "id": "c1", "name": "A" } })).unwrap();
        assert_eq!(entity.id.as_deref(), Some("c1"));
        assert_eq!(entity.title.as_deref(), Some("A"));
    }

    #[test]
    fn test_unwrap_bare_entity() {
        let entity = unwrap_entity(json!({ "id": "c1", "title": "A" })).unwrap();
        assert_eq!(entity.id.as_deref(), Some("c1"));
    }

    use std::path::PathBuf;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned response and return the base URL
    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut read = 0;
            loop {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                read += n;
                if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response =
                format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{addr}")
    }

    fn api_for(base_url: String) -> RestCollectionsApi {
        RestCollectionsApi::new(&Config {
            api_base_url: base_url,
            api_timeout_seconds: 5,
            storage_dir: PathBuf::from("."),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_image_tolerates_missing_endpoint() {
        let api = api_for(serve_once("404 Not Found").await);

        // Backends without the image field respond 404; that is a soft
        // condition, not an error
        api.update_image("jwt-test", "c1", Some("https://cdn/cover.jpg"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_image_propagates_server_errors() {
        let api = api_for(serve_once("500 Internal Server Error").await);

        let err = api
            .update_image("jwt-test", "c1", Some("https://cdn/cover.jpg"))
            .await
            .unwrap_err();

        match err {
            StoreError::Api { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected error: {other}"),
        }
    }
}
