use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Id prefix for collections created without a credential. These records
/// have never been seen by the server and skip reconciliation entirely.
pub const LOCAL_ID_PREFIX: &str = "local-";

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// A named set of property references owned by the current user.
///
/// Serialized in camelCase so the persisted blob matches the wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Cover image URL (first associated property's photo unless set explicitly)
    pub image: Option<String>,
    pub property_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Collection {
    /// Synthesize a record for a user who has no credential yet
    pub fn new_local(title: &str, description: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            image: None,
            property_ids: Vec::new(),
            user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_local_only(&self) -> bool {
        is_local_id(&self.id)
    }
}

#[derive(Debug, Clone)]
pub struct CreateCollection {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCollection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
