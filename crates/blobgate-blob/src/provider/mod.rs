//! Capability traits over the object-storage provider
//!
//! The blob service never touches an SDK type directly: it talks to a
//! [`StorageProvider`], which hands out one [`ObjectHandle`] per object key.
//! Two providers ship with the crate: [`S3Provider`] for S3-compatible
//! services and [`MemoryProvider`] for local development and tests.

mod connection;
mod memory;
mod s3;

use std::io;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use futures::Stream;
use thiserror::Error;

pub use connection::{ConnectionString, ConnectionStringError, S3Settings};
pub use memory::MemoryProvider;
pub use s3::S3Provider;

/// Byte stream handed back by a download, piped straight into a response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Minutes a signed URL is valid on each side of its generation time
pub const SIGNED_URL_MARGIN_MINUTES: i64 = 100;

/// Errors raised by a storage provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("container '{0}' does not exist")]
    ContainerNotFound(String),

    #[error("blob '{0}' does not exist")]
    BlobNotFound(String),

    #[error("{0}")]
    Request(String),

    #[error("{0}")]
    Signing(String),
}

/// Result of a delete-if-exists call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Whether the provider actually removed an object
    pub succeeded: bool,
}

/// One object reported by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
}

/// Validity window of a read-only signed URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedUrlWindow {
    pub starts_on: DateTime<Utc>,
    pub expires_on: DateTime<Utc>,
}

impl SignedUrlWindow {
    /// Window opening [`SIGNED_URL_MARGIN_MINUTES`] before `generated_at` and
    /// closing the same amount after it. The lead margin absorbs clock skew
    /// between this host, the provider and the caller.
    pub fn around(generated_at: DateTime<Utc>) -> Self {
        let margin = Duration::minutes(SIGNED_URL_MARGIN_MINUTES);
        Self {
            starts_on: generated_at - margin,
            expires_on: generated_at + margin,
        }
    }

    /// Window around the current time
    pub fn from_now() -> Self {
        Self::around(Utc::now())
    }

    /// Total validity of the grant
    pub fn duration(&self) -> Duration {
        self.expires_on - self.starts_on
    }
}

/// Operations against a single object
#[async_trait]
pub trait ObjectHandle: Send + Sync {
    /// Key of the object within its container
    fn key(&self) -> &str;

    /// Replace the object's content with `data` in a single call
    async fn write_all(&self, data: Bytes) -> Result<(), ProviderError>;

    /// Start a download of the object's content
    async fn open_read_stream(&self) -> Result<ByteStream, ProviderError>;

    /// Remove the object when present
    async fn delete_if_exists(&self) -> Result<DeleteOutcome, ProviderError>;

    /// Build a read-only URL valid for `window`
    async fn sign_read_url(&self, window: SignedUrlWindow) -> Result<String, ProviderError>;
}

/// Container lifecycle and handle lookup
#[async_trait]
pub trait ContainerStore: Send + Sync {
    async fn exists(&self, container: &str) -> Result<bool, ProviderError>;

    /// Create the container. Creating one that already exists is not an error.
    async fn create(&self, container: &str) -> Result<(), ProviderError>;

    /// Handle for `key` inside `container`, or `None` when the provider
    /// cannot produce one.
    async fn object_handle(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Option<Box<dyn ObjectHandle>>, ProviderError>;
}

/// Flat enumeration of a container
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// Every object in `container`, all pages consumed, in provider order
    async fn list_all(&self, container: &str) -> Result<Vec<ObjectEntry>, ProviderError>;
}

/// Everything the blob service needs from a provider
pub trait StorageProvider: ContainerStore + ObjectLister {}

impl<T> StorageProvider for T where T: ContainerStore + ObjectLister {}

/// Build the provider selected by `connection`
pub fn connect(connection: &ConnectionString) -> Arc<dyn StorageProvider> {
    match connection {
        ConnectionString::InMemory => Arc::new(MemoryProvider::new()),
        ConnectionString::S3(settings) => Arc::new(S3Provider::new(settings)),
    }
}
