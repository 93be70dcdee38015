pub mod memory;
pub mod rest;

pub use memory::InMemoryCollectionsApi;
pub use rest::RestCollectionsApi;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{CreateCollection, RemoteCollection, UpdateCollection};

/// Collections endpoint of the REST backend.
///
/// Every call carries the caller's bearer token; the store never invokes the
/// API without one. Membership sync is replace-style: the full property-id
/// list is sent, not an incremental append/remove.
#[async_trait]
pub trait CollectionsApi: Send + Sync {
    /// List the current user's collections
    async fn list(&self, token: &str) -> StoreResult<Vec<RemoteCollection>>;

    /// Create a collection and return the server's view of it
    async fn create(&self, token: &str, input: &CreateCollection) -> StoreResult<RemoteCollection>;

    /// Patch title/description
    async fn update(&self, token: &str, id: &str, patch: &UpdateCollection) -> StoreResult<()>;

    /// Patch the cover image
    async fn update_image(&self, token: &str, id: &str, image: Option<&str>) -> StoreResult<()>;

    /// Replace the full membership list
    async fn replace_properties(
        &self,
        token: &str,
        id: &str,
        property_ids: &[String],
    ) -> StoreResult<()>;

    /// Delete a collection
    async fn delete(&self, token: &str, id: &str) -> StoreResult<()>;
}
