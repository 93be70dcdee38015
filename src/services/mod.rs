pub mod collections;

pub use collections::{CollectionStore, STORAGE_KEY};
