//! Blob client resolution: container bootstrap plus handle lookup

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::BlobError;
use crate::provider::{ObjectEntry, ObjectHandle, ProviderError, StorageProvider};

/// Hands out object handles, creating containers on first use
#[derive(Clone)]
pub struct BlobClientResolver {
    provider: Arc<dyn StorageProvider>,
}

impl BlobClientResolver {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Handle for `key` in `container`.
    ///
    /// The container is created when missing. The existence check and the
    /// create are not locked; two racing callers may both create, which the
    /// provider treats as a no-op.
    pub async fn resolve(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectHandle>, BlobError> {
        self.ensure_container(container)
            .await
            .map_err(|e| BlobError::ClientResolution(e.to_string()))?;

        match self.provider.object_handle(container, key).await {
            Ok(Some(handle)) => Ok(handle),
            Ok(None) => Err(BlobError::ClientResolution(format!(
                "Blob client is undefined for container: {} and blob: {}",
                container, key
            ))),
            Err(e) => Err(BlobError::ClientResolution(e.to_string())),
        }
    }

    /// Enumerate `container` without creating it
    pub async fn list_objects(&self, container: &str) -> Result<Vec<ObjectEntry>, ProviderError> {
        self.provider.list_all(container).await
    }

    async fn ensure_container(&self, container: &str) -> Result<(), ProviderError> {
        if self.provider.exists(container).await? {
            return Ok(());
        }

        info!("Container {} does not exist, creating it", container);
        self.provider.create(container).await?;
        debug!("Container {} ready", container);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ContainerStore, MemoryProvider, ObjectLister};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts container calls and never yields a handle
    #[derive(Default)]
    struct CountingProvider {
        exists: bool,
        exists_calls: AtomicUsize,
        create_calls: AtomicUsize,
    }

    #[async_trait]
    impl ContainerStore for CountingProvider {
        async fn exists(&self, _container: &str) -> Result<bool, ProviderError> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.exists)
        }

        async fn create(&self, _container: &str) -> Result<(), ProviderError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn object_handle(
            &self,
            _container: &str,
            _key: &str,
        ) -> Result<Option<Box<dyn ObjectHandle>>, ProviderError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl ObjectLister for CountingProvider {
        async fn list_all(&self, _container: &str) -> Result<Vec<ObjectEntry>, ProviderError> {
            Ok(Vec::new())
        }
    }

    /// Provider whose every call fails
    struct UnreachableProvider;

    #[async_trait]
    impl ContainerStore for UnreachableProvider {
        async fn exists(&self, _container: &str) -> Result<bool, ProviderError> {
            Err(ProviderError::Request("connection refused".to_string()))
        }

        async fn create(&self, _container: &str) -> Result<(), ProviderError> {
            unreachable!("create must not run after a failed existence check")
        }

        async fn object_handle(
            &self,
            _container: &str,
            _key: &str,
        ) -> Result<Option<Box<dyn ObjectHandle>>, ProviderError> {
            unreachable!("no handle lookup after a failed existence check")
        }
    }

    #[async_trait]
    impl ObjectLister for UnreachableProvider {
        async fn list_all(&self, _container: &str) -> Result<Vec<ObjectEntry>, ProviderError> {
            Err(ProviderError::Request("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_resolve_creates_missing_container() {
        let provider = Arc::new(MemoryProvider::new());
        let resolver = BlobClientResolver::new(provider.clone());

        let handle = resolver.resolve("images", "image.jpg").await.unwrap();

        assert_eq!(handle.key(), "image.jpg");
        assert!(provider.exists("images").await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_skips_create_for_existing_container() {
        let provider = Arc::new(CountingProvider {
            exists: true,
            ..Default::default()
        });
        let resolver = BlobClientResolver::new(provider.clone());

        let _ = resolver.resolve("images", "image.jpg").await;

        assert_eq!(provider.exists_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_handle_is_an_error() {
        let provider = Arc::new(CountingProvider::default());
        let resolver = BlobClientResolver::new(provider.clone());

        let err = resolver.resolve("images", "image.jpg").await.err().unwrap();

        assert_eq!(provider.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            err.to_string(),
            "Error getting blob client: Blob client is undefined for container: images and blob: image.jpg."
        );
    }

    #[tokio::test]
    async fn test_provider_failure_is_wrapped() {
        let resolver = BlobClientResolver::new(Arc::new(UnreachableProvider));

        let err = resolver.resolve("images", "image.jpg").await.err().unwrap();

        assert_eq!(
            err,
            BlobError::ClientResolution("connection refused".to_string())
        );
    }
}
