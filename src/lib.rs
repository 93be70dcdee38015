// Client-side collection store for the ForYou real-estate marketplace.
// Exports the store service plus its API, storage and credential collaborators.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{StoreError, StoreResult};
pub use models::Collection;
pub use services::{CollectionStore, STORAGE_KEY};
