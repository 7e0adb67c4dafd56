//! In-memory storage provider
//!
//! Keeps every container in a process-local map. Data is lost when the
//! provider is dropped. Signed URLs use the `memory://` scheme and are not
//! resolvable outside the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    ByteStream, ContainerStore, DeleteOutcome, ObjectEntry, ObjectHandle, ObjectLister,
    ProviderError, SignedUrlWindow,
};

/// Keys are kept ordered so listings come back lexicographically, like S3.
type Containers = HashMap<String, BTreeMap<String, Bytes>>;

/// In-memory implementation of [`super::StorageProvider`]
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    containers: Arc<RwLock<Containers>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects stored in `container` (0 when it does not exist)
    pub async fn object_count(&self, container: &str) -> usize {
        self.containers
            .read()
            .await
            .get(container)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl ContainerStore for MemoryProvider {
    async fn exists(&self, container: &str) -> Result<bool, ProviderError> {
        Ok(self.containers.read().await.contains_key(container))
    }

    async fn create(&self, container: &str) -> Result<(), ProviderError> {
        let mut containers = self.containers.write().await;
        if !containers.contains_key(container) {
            debug!("Creating in-memory container {}", container);
            containers.insert(container.to_string(), BTreeMap::new());
        }
        Ok(())
    }

    async fn object_handle(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Option<Box<dyn ObjectHandle>>, ProviderError> {
        Ok(Some(Box::new(MemoryObject {
            containers: self.containers.clone(),
            container: container.to_string(),
            key: key.to_string(),
        })))
    }
}

#[async_trait]
impl ObjectLister for MemoryProvider {
    async fn list_all(&self, container: &str) -> Result<Vec<ObjectEntry>, ProviderError> {
        let containers = self.containers.read().await;
        let objects = containers
            .get(container)
            .ok_or_else(|| ProviderError::ContainerNotFound(container.to_string()))?;

        Ok(objects
            .keys()
            .map(|key| ObjectEntry { key: key.clone() })
            .collect())
    }
}

/// Handle to one object of a [`MemoryProvider`]
struct MemoryObject {
    containers: Arc<RwLock<Containers>>,
    container: String,
    key: String,
}

#[async_trait]
impl ObjectHandle for MemoryObject {
    fn key(&self) -> &str {
        &self.key
    }

    async fn write_all(&self, data: Bytes) -> Result<(), ProviderError> {
        let mut containers = self.containers.write().await;
        let objects = containers
            .get_mut(&self.container)
            .ok_or_else(|| ProviderError::ContainerNotFound(self.container.clone()))?;

        debug!("PUT memory://{}/{} ({} bytes)", self.container, self.key, data.len());
        objects.insert(self.key.clone(), data);
        Ok(())
    }

    async fn open_read_stream(&self) -> Result<ByteStream, ProviderError> {
        let containers = self.containers.read().await;
        let data = containers
            .get(&self.container)
            .ok_or_else(|| ProviderError::ContainerNotFound(self.container.clone()))?
            .get(&self.key)
            .cloned()
            .ok_or_else(|| ProviderError::BlobNotFound(self.key.clone()))?;

        debug!("GET memory://{}/{}", self.container, self.key);
        Ok(Box::pin(stream::once(async move { Ok(data) })))
    }

    async fn delete_if_exists(&self) -> Result<DeleteOutcome, ProviderError> {
        let mut containers = self.containers.write().await;
        let removed = containers
            .get_mut(&self.container)
            .and_then(|objects| objects.remove(&self.key))
            .is_some();

        debug!("DELETE memory://{}/{} (removed: {})", self.container, self.key, removed);
        Ok(DeleteOutcome { succeeded: removed })
    }

    async fn sign_read_url(&self, window: SignedUrlWindow) -> Result<String, ProviderError> {
        Ok(format!(
            "memory://{}/{}?sp=r&st={}&se={}",
            urlencoding::encode(&self.container),
            urlencoding::encode(&self.key),
            urlencoding::encode(&window.starts_on.to_rfc3339()),
            urlencoding::encode(&window.expires_on.to_rfc3339()),
        ))
    }
}
