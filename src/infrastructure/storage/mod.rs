//! File-based credential storage

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::application::errors::StorageError;
use crate::domain::entities::Credentials;
use crate::domain::traits::CredentialStore;

/// Credentials kept as a pretty-printed JSON file
pub struct JsonCredentialStore {
    path: PathBuf,
}

impl JsonCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for JsonCredentialStore {
    async fn load(&self) -> Result<Credentials, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let credentials: Credentials = serde_json::from_str(&content).map_err(|e| {
            StorageError::Serialization(format!("{} is not valid JSON: {}", self.path.display(), e))
        })?;
        tracing::info!("AppState loaded successfully");
        Ok(credentials)
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        credentials
            .serialize(&mut ser)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        tokio::fs::write(&self.path, buf).await?;
        tracing::debug!("AppState saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("messenger-bot-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = JsonCredentialStore::new(temp_path("appstate.json"));
        let creds = Credentials::new(serde_json::json!([{"key": "c_user", "value": "1"}]));

        store.save(&creds).await.unwrap();
        let written = std::fs::read_to_string(store.path()).unwrap();

        assert!(written.contains("\n    {"), "expected 4-space indent:\n{}", written);
        assert_eq!(store.load().await.unwrap(), creds);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let store = JsonCredentialStore::new(temp_path("absent.json"));
        assert!(matches!(store.load().await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn garbage_is_a_serialization_error() {
        let path = temp_path("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonCredentialStore::new(path);
        assert!(matches!(store.load().await, Err(StorageError::Serialization(_))));
    }
}
