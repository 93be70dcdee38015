use async_trait::async_trait;
use tokio::sync::Mutex;

/// Access to the bearer token held by the auth collaborator.
///
/// Token issuance and refresh live outside this crate; the store only needs
/// to know whether a credential exists right now. Absence is not an error,
/// it selects local/offline mode.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// Credential holder kept in memory, set by the owning application
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.lock().await = Some(token.into());
    }

    pub async fn clear(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_clear() {
        let credentials = MemoryCredentialStore::new();
        assert!(credentials.token().await.is_none());

        credentials.set_token("jwt-1").await;
        assert_eq!(credentials.token().await.as_deref(), Some("jwt-1"));

        credentials.clear().await;
        assert!(credentials.token().await.is_none());
    }
}
