use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::models::Collection;

/// Collection payload as the backend actually sends it.
///
/// Field naming drifted across backend revisions, so every known variant is
/// accepted: `title`/`name`, `propertyIds`/`properties` (ids or nested
/// objects), camelCase or snake_case timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCollection {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "propertyIds", alias = "properties")]
    pub property_ids: Vec<RemoteMember>,
    #[serde(default, rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default, rename = "createdAt", alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(default, rename = "updatedAt", alias = "updated_at")]
    pub updated_at: Option<String>,
}

/// Membership entry: either a bare property id or a nested object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RemoteMember {
    Id(String),
    Object(serde_json::Map<String, Value>),
}

impl RemoteMember {
    pub fn property_id(&self) -> Option<String> {
        match self {
            Self::Id(id) => Some(id.clone()),
            Self::Object(map) => ["propertyId", "property_id", "id"]
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

impl RemoteCollection {
    /// Map to the local model. Records without an id are unusable and dropped.
    ///
    /// Absent or unparsable timestamps default to the current time.
    pub fn try_into_collection(self) -> Option<Collection> {
        let id = self.id?;
        let now = OffsetDateTime::now_utc();

        let mut seen = HashSet::new();
        let property_ids: Vec<String> = self
            .property_ids
            .iter()
            .filter_map(RemoteMember::property_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Some(Collection {
            id,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            image: self.image,
            property_ids,
            user_id: self.user_id,
            created_at: parse_timestamp(self.created_at.as_deref(), now),
            updated_at: parse_timestamp(self.updated_at.as_deref(), now),
        })
    }
}

fn parse_timestamp(raw: Option<&str>, fallback: OffsetDateTime) -> OffsetDateTime {
    raw.and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
        .unwrap_or(fallback)
}
