//! Blob Service: upload, fetch, delete, sign and list on top of a provider

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::resolver::BlobClientResolver;
use crate::error::BlobError;
use crate::provider::{ByteStream, SignedUrlWindow, StorageProvider};

/// Separator between the generated id and the original file name in a key
pub const KEY_SEPARATOR: char = '_';

/// Message returned with every successful upload
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";

/// A stored blob together with a temporary read URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    /// Human-readable outcome
    pub message: String,
    /// Object key inside the container
    pub file_name: String,
    /// Owning container
    pub container_name: String,
    /// Read-only signed URL
    pub url: String,
}

/// Blob Service for file storage operations
#[derive(Clone)]
pub struct BlobService {
    resolver: BlobClientResolver,
}

impl BlobService {
    /// Create a new Blob service on top of `provider`
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self {
            resolver: BlobClientResolver::new(provider),
        }
    }

    /// Store `body` under a fresh key derived from `original_name` and sign a
    /// read URL for it. The whole payload is written in one call; nothing is
    /// cleaned up if a later step fails.
    pub async fn upload_file(
        &self,
        body: Bytes,
        original_name: &str,
        container: &str,
    ) -> Result<BlobInfo, BlobError> {
        let upload_error = |e: BlobError| BlobError::Upload {
            file_name: original_name.to_string(),
            reason: e.reason(),
        };

        let file_name = generate_object_key(original_name).map_err(upload_error)?;
        let size = body.len();

        let handle = self
            .resolver
            .resolve(container, &file_name)
            .await
            .map_err(upload_error)?;

        handle.write_all(body).await.map_err(|e| {
            error!("Upload of {}/{} failed: {}", container, file_name, e);
            BlobError::Upload {
                file_name: original_name.to_string(),
                reason: e.to_string(),
            }
        })?;

        info!("Uploaded {}/{} ({} bytes)", container, file_name, size);

        let url = self
            .generate_temporary_url(&file_name, container)
            .await
            .map_err(upload_error)?;

        Ok(BlobInfo {
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            file_name,
            container_name: container.to_string(),
            url,
        })
    }

    /// Open a download of `file_name`. Bytes are streamed as the provider
    /// yields them.
    pub async fn get_file(
        &self,
        file_name: &str,
        container: &str,
    ) -> Result<ByteStream, BlobError> {
        let fetch_error = |reason: String| BlobError::Fetch {
            file_name: file_name.to_string(),
            reason,
        };

        let handle = self
            .resolver
            .resolve(container, file_name)
            .await
            .map_err(|e| fetch_error(e.reason()))?;

        debug!("Opening download of {}/{}", container, file_name);
        handle
            .open_read_stream()
            .await
            .map_err(|e| fetch_error(e.to_string()))
    }

    /// Delete `file_name`. A delete the provider reports as not performed is
    /// a failure, not a silent success.
    pub async fn delete_file(
        &self,
        file_name: &str,
        container: &str,
    ) -> Result<String, BlobError> {
        let delete_error = |reason: String| BlobError::Delete {
            file_name: file_name.to_string(),
            reason,
        };

        let handle = self
            .resolver
            .resolve(container, file_name)
            .await
            .map_err(|e| delete_error(e.reason()))?;

        let outcome = handle
            .delete_if_exists()
            .await
            .map_err(|e| delete_error(e.to_string()))?;

        if !outcome.succeeded {
            debug!("Delete of {}/{} reported no object removed", container, file_name);
            return Err(delete_error(
                "blob does not exist or could not be deleted".to_string(),
            ));
        }

        info!("Deleted {}/{}", container, file_name);
        Ok(format!("File {} deleted successfully.", file_name))
    }

    /// Read-only URL for `file_name`, valid from 100 minutes before now until
    /// 100 minutes after.
    pub async fn generate_temporary_url(
        &self,
        file_name: &str,
        container: &str,
    ) -> Result<String, BlobError> {
        let handle = self
            .resolver
            .resolve(container, file_name)
            .await
            .map_err(|e| BlobError::TemporaryUrl(e.reason()))?;

        let window = SignedUrlWindow::from_now();
        debug!(
            "Signing read URL for {}/{} ({} to {})",
            container, file_name, window.starts_on, window.expires_on
        );

        handle
            .sign_read_url(window)
            .await
            .map_err(|e| BlobError::TemporaryUrl(e.to_string()))
    }

    /// Every blob in `container`, each with a freshly signed URL. Signing is
    /// sequential, one provider round trip per blob.
    pub async fn list_files(&self, container: &str) -> Result<Vec<BlobInfo>, BlobError> {
        let entries = self
            .resolver
            .list_objects(container)
            .await
            .map_err(|e| BlobError::List(e.to_string()))?;

        debug!("Listing {} blobs in {}", entries.len(), container);

        let mut files = Vec::with_capacity(entries.len());
        for entry in entries {
            let url = self
                .generate_temporary_url(&entry.key, container)
                .await
                .map_err(|e| BlobError::List(e.reason()))?;

            files.push(BlobInfo {
                message: format!("File {} listed successfully", entry.key),
                file_name: entry.key,
                container_name: container.to_string(),
                url,
            });
        }

        Ok(files)
    }
}

/// Build a collision-resistant key: `<uuid-v4>_<file name>`.
///
/// Directory components of `original_name` are dropped; uniqueness rests on
/// the uuid alone, the container is never consulted.
pub fn generate_object_key(original_name: &str) -> Result<String, BlobError> {
    let file_name = original_name
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or_default()
        .trim();

    if file_name.is_empty() || file_name == "." || file_name == ".." {
        return Err(BlobError::InvalidFileName(original_name.to_string()));
    }

    Ok(format!("{}{}{}", Uuid::new_v4(), KEY_SEPARATOR, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{
        ContainerStore, DeleteOutcome, MemoryProvider, ObjectEntry, ObjectHandle, ObjectLister,
        ProviderError,
    };
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const CONTAINER: &str = "container-test";

    fn memory_service() -> (BlobService, Arc<MemoryProvider>) {
        let provider = Arc::new(MemoryProvider::new());
        (BlobService::new(provider.clone()), provider)
    }

    async fn read_all(stream: ByteStream) -> Vec<u8> {
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        chunks.concat()
    }

    /// Handle stub with scripted outcomes, recording signed windows
    struct ScriptedHandle {
        key: String,
        delete_succeeds: bool,
        fail_sign: bool,
        fail_write: bool,
        windows: Arc<Mutex<Vec<SignedUrlWindow>>>,
        delete_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ObjectHandle for ScriptedHandle {
        fn key(&self) -> &str {
            &self.key
        }

        async fn write_all(&self, _data: Bytes) -> Result<(), ProviderError> {
            if self.fail_write {
                return Err(ProviderError::Request("storage rejected write".to_string()));
            }
            Ok(())
        }

        async fn open_read_stream(&self) -> Result<ByteStream, ProviderError> {
            Err(ProviderError::BlobNotFound(self.key.clone()))
        }

        async fn delete_if_exists(&self) -> Result<DeleteOutcome, ProviderError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            Ok(DeleteOutcome {
                succeeded: self.delete_succeeds,
            })
        }

        async fn sign_read_url(&self, window: SignedUrlWindow) -> Result<String, ProviderError> {
            if self.fail_sign {
                return Err(ProviderError::Signing("account key rejected".to_string()));
            }
            self.windows.lock().unwrap().push(window);
            Ok(format!("https://signed.example/{}", self.key))
        }
    }

    #[derive(Default)]
    struct ScriptedProvider {
        delete_succeeds: bool,
        fail_sign: bool,
        fail_write: bool,
        listing: Vec<String>,
        windows: Arc<Mutex<Vec<SignedUrlWindow>>>,
        delete_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ContainerStore for ScriptedProvider {
        async fn exists(&self, _container: &str) -> Result<bool, ProviderError> {
            Ok(true)
        }

        async fn create(&self, _container: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn object_handle(
            &self,
            _container: &str,
            key: &str,
        ) -> Result<Option<Box<dyn ObjectHandle>>, ProviderError> {
            Ok(Some(Box::new(ScriptedHandle {
                key: key.to_string(),
                delete_succeeds: self.delete_succeeds,
                fail_sign: self.fail_sign,
                fail_write: self.fail_write,
                windows: self.windows.clone(),
                delete_calls: self.delete_calls.clone(),
            })))
        }
    }

    #[async_trait]
    impl ObjectLister for ScriptedProvider {
        async fn list_all(&self, _container: &str) -> Result<Vec<ObjectEntry>, ProviderError> {
            Ok(self
                .listing
                .iter()
                .map(|key| ObjectEntry { key: key.clone() })
                .collect())
        }
    }

    /// Provider whose existence check always fails
    struct UnreachableProvider;

    #[async_trait]
    impl ContainerStore for UnreachableProvider {
        async fn exists(&self, _container: &str) -> Result<bool, ProviderError> {
            Err(ProviderError::Request("connection refused".to_string()))
        }

        async fn create(&self, _container: &str) -> Result<(), ProviderError> {
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
    impl ObjectLister for UnreachableProvider {
        async fn list_all(&self, _container: &str) -> Result<Vec<ObjectEntry>, ProviderError> {
            Err(ProviderError::Request("connection refused".to_string()))
        }
    }

    #[test]
    fn test_generate_object_key() {
        let key = generate_object_key("file.txt").unwrap();
        let (id, name) = key.split_once(KEY_SEPARATOR).unwrap();

        assert_eq!(name, "file.txt");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_generate_object_key_is_unique_per_call() {
        let first = generate_object_key("file.txt").unwrap();
        let second = generate_object_key("file.txt").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_generate_object_key_strips_directories() {
        assert!(generate_object_key("../../etc/passwd").unwrap().ends_with("_passwd"));
        assert!(generate_object_key("C:\\Users\\me\\photo.png")
            .unwrap()
            .ends_with("_photo.png"));
    }

    #[test]
    fn test_generate_object_key_rejects_empty_names() {
        for name in ["", "   ", "dir/", "..", "."] {
            assert_eq!(
                generate_object_key(name),
                Err(BlobError::InvalidFileName(name.to_string())),
                "Failed for {:?}",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_upload_fetch_delete_scenario() {
        let (service, _) = memory_service();

        let uploaded = service
            .upload_file(Bytes::from_static(b"Test file content"), "file.txt", CONTAINER)
            .await
            .unwrap();

        assert_eq!(uploaded.message, "File uploaded successfully");
        assert!(uploaded.file_name.ends_with("file.txt"));
        assert_ne!(uploaded.file_name, "file.txt");
        assert_eq!(uploaded.container_name, CONTAINER);
        assert!(!uploaded.url.is_empty());

        let stream = service.get_file(&uploaded.file_name, CONTAINER).await.unwrap();
        assert_eq!(read_all(stream).await, b"Test file content");

        let confirmation = service
            .delete_file(&uploaded.file_name, CONTAINER)
            .await
            .unwrap();
        assert_eq!(
            confirmation,
            format!("File {} deleted successfully.", uploaded.file_name)
        );

        let err = service
            .get_file(&uploaded.file_name, CONTAINER)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BlobError::Fetch { .. }));
        assert!(err
            .to_string()
            .starts_with(&format!("Failed to get file {}:", uploaded.file_name)));
    }

    #[tokio::test]
    async fn test_upload_same_name_twice_keeps_both() {
        let (service, provider) = memory_service();

        let first = service
            .upload_file(Bytes::from_static(b"one"), "report.pdf", CONTAINER)
            .await
            .unwrap();
        let second = service
            .upload_file(Bytes::from_static(b"two"), "report.pdf", CONTAINER)
            .await
            .unwrap();

        assert_ne!(first.file_name, second.file_name);
        assert_eq!(provider.object_count(CONTAINER).await, 2);

        let stream = service.get_file(&first.file_name, CONTAINER).await.unwrap();
        assert_eq!(read_all(stream).await, b"one");
    }

    #[tokio::test]
    async fn test_upload_empty_payload() {
        let (service, _) = memory_service();

        let uploaded = service
            .upload_file(Bytes::new(), "empty.bin", CONTAINER)
            .await
            .unwrap();

        let stream = service.get_file(&uploaded.file_name, CONTAINER).await.unwrap();
        assert!(read_all(stream).await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_invalid_name() {
        let (service, provider) = memory_service();

        let err = service
            .upload_file(Bytes::from_static(b"x"), "", CONTAINER)
            .await
            .unwrap_err();

        assert!(matches!(err, BlobError::Upload { .. }));
        assert!(!provider.exists(CONTAINER).await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_fails_when_signing_fails() {
        let provider = Arc::new(ScriptedProvider {
            fail_sign: true,
            ..Default::default()
        });
        let service = BlobService::new(provider);

        let err = service
            .upload_file(Bytes::from_static(b"x"), "a.txt", CONTAINER)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to upload file a.txt: Failed to generate temporary URL: account key rejected."
        );
    }

    #[tokio::test]
    async fn test_upload_write_failure_is_wrapped() {
        let provider = Arc::new(ScriptedProvider {
            fail_write: true,
            ..Default::default()
        });
        let delete_calls = provider.delete_calls.clone();
        let windows = provider.windows.clone();
        let service = BlobService::new(provider);

        let err = service
            .upload_file(Bytes::from_static(b"x"), "a.txt", CONTAINER)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to upload file a.txt: storage rejected write."
        );
        // Nothing is signed and nothing is cleaned up
        assert!(windows.lock().unwrap().is_empty());
        assert_eq!(delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_wrapped_per_operation() {
        let service = BlobService::new(Arc::new(UnreachableProvider));

        let upload = service
            .upload_file(Bytes::from_static(b"x"), "a.txt", CONTAINER)
            .await
            .unwrap_err();
        let fetch = service.get_file("x", CONTAINER).await.err().unwrap();
        let delete = service.delete_file("x", CONTAINER).await.unwrap_err();

        let cases = vec![
            (
                upload,
                "Failed to upload file a.txt: Error getting blob client: connection refused.",
            ),
            (
                fetch,
                "Failed to get file x: Error getting blob client: connection refused.",
            ),
            (
                delete,
                "Failed to delete file x: Error getting blob client: connection refused.",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected, "Failed for {}", expected);
        }
    }

    #[tokio::test]
    async fn test_delete_not_succeeded_is_failure() {
        let provider = Arc::new(ScriptedProvider {
            delete_succeeds: false,
            ..Default::default()
        });
        let service = BlobService::new(provider);

        let err = service.delete_file("abc_a.txt", CONTAINER).await.unwrap_err();

        assert_eq!(
            err,
            BlobError::Delete {
                file_name: "abc_a.txt".to_string(),
                reason: "blob does not exist or could not be deleted".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_delete_missing_blob_fails() {
        let (service, _) = memory_service();

        let err = service.delete_file("never-uploaded.txt", CONTAINER).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to delete file never-uploaded.txt:"));
    }

    #[tokio::test]
    async fn test_temporary_url_window() {
        let provider = Arc::new(ScriptedProvider::default());
        let windows = provider.windows.clone();
        let service = BlobService::new(provider);

        let before = chrono::Utc::now();
        let url = service.generate_temporary_url("a.txt", CONTAINER).await.unwrap();
        let after = chrono::Utc::now();

        assert_eq!(url, "https://signed.example/a.txt");

        let windows = windows.lock().unwrap();
        assert_eq!(windows.len(), 1);
        let window = windows[0];
        assert_eq!(window.duration(), chrono::Duration::minutes(200));

        let generated_at = window.starts_on + chrono::Duration::minutes(100);
        assert!(generated_at >= before && generated_at <= after);
    }

    #[tokio::test]
    async fn test_temporary_url_failure_is_wrapped() {
        let provider = Arc::new(ScriptedProvider {
            fail_sign: true,
            ..Default::default()
        });
        let service = BlobService::new(provider);

        let err = service
            .generate_temporary_url("a.txt", CONTAINER)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BlobError::TemporaryUrl("account key rejected".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_empty_container() {
        let (service, provider) = memory_service();
        provider.create(CONTAINER).await.unwrap();

        assert!(service.list_files(CONTAINER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_container_fails() {
        let (service, provider) = memory_service();

        let err = service.list_files(CONTAINER).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to list files:"));
        // Listing never creates the container
        assert!(!provider.exists(CONTAINER).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_signs_every_entry() {
        let (service, _) = memory_service();
        let mut uploaded = Vec::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            let info = service
                .upload_file(Bytes::from_static(b"data"), name, CONTAINER)
                .await
                .unwrap();
            uploaded.push(info.file_name);
        }
        uploaded.sort();

        let files = service.list_files(CONTAINER).await.unwrap();

        assert_eq!(files.len(), 3);
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, uploaded);
        for file in &files {
            assert!(!file.url.is_empty());
            assert_eq!(file.container_name, CONTAINER);
            assert_eq!(
                file.message,
                format!("File {} listed successfully", file.file_name)
            );
        }
    }

    #[tokio::test]
    async fn test_list_aborts_when_signing_fails() {
        let provider = Arc::new(ScriptedProvider {
            fail_sign: true,
            listing: vec!["a.txt".to_string(), "b.txt".to_string()],
            ..Default::default()
        });
        let service = BlobService::new(provider);

        let err = service.list_files(CONTAINER).await.unwrap_err();
        assert_eq!(
            err,
            BlobError::List("Failed to generate temporary URL: account key rejected".to_string())
        );
    }
}
