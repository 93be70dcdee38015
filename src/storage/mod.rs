pub mod file;
pub mod memory;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Key-value blob persistence for client state.
///
/// The store keeps one named blob per concern (the collection list lives
/// under a single fixed key) and rehydrates it at startup.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a blob, `None` if the key was never written
    async fn load(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a blob, replacing any previous value
    async fn save(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Drop a blob; removing an absent key is a no-op
    async fn remove(&self, key: &str) -> StoreResult<()>;
}
