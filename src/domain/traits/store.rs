use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::Credentials;

/// Store trait - abstraction for credential persistence
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Credentials, StorageError>;
    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError>;
}
