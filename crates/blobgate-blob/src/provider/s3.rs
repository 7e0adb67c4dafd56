//! S3-compatible storage provider (AWS S3, MinIO, RustFS, ...)
//!
//! Containers map to buckets, blob keys to object keys.

use std::time::SystemTime;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::connection::{S3Settings, DEFAULT_REGION};
use super::{
    ByteStream, ContainerStore, DeleteOutcome, ObjectEntry, ObjectHandle, ObjectLister,
    ProviderError, SignedUrlWindow,
};

/// S3 implementation of [`super::StorageProvider`]
#[derive(Debug, Clone)]
pub struct S3Provider {
    client: Client,
    region: String,
}

impl S3Provider {
    /// Build the client from parsed connection settings. No request is sent.
    pub fn new(settings: &S3Settings) -> Self {
        debug!(
            "Initializing S3 client (region: {}, endpoint: {:?})",
            settings.region, settings.endpoint
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(settings.region.clone()))
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .credentials_provider(Credentials::new(
                settings.access_key_id.clone(),
                settings.secret_access_key.clone(),
                None,
                None,
                "blobgate",
            ))
            .force_path_style(settings.force_path_style);

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            region: settings.region.clone(),
        }
    }
}

fn request_error<E>(error: E) -> ProviderError
where
    E: std::error::Error,
{
    ProviderError::Request(DisplayErrorContext(error).to_string())
}

#[async_trait]
impl ContainerStore for S3Provider {
    async fn exists(&self, container: &str) -> Result<bool, ProviderError> {
        match self.client.head_bucket().bucket(container).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                debug!("Bucket {} does not exist", container);
                Ok(false)
            }
            Err(err) => Err(request_error(err)),
        }
    }

    async fn create(&self, container: &str) -> Result<(), ProviderError> {
        let mut request = self.client.create_bucket().bucket(container);

        // us-east-1 rejects an explicit location constraint
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!("Created bucket {}", container);
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
            {
                debug!("Bucket {} was created concurrently", container);
                Ok(())
            }
            Err(err) => Err(request_error(err)),
        }
    }

    async fn object_handle(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Option<Box<dyn ObjectHandle>>, ProviderError> {
        Ok(Some(Box::new(S3Object {
            client: self.client.clone(),
            bucket: container.to_string(),
            key: key.to_string(),
        })))
    }
}

#[async_trait]
impl ObjectLister for S3Provider {
    async fn list_all(&self, container: &str) -> Result<Vec<ObjectEntry>, ProviderError> {
        debug!("LIST {}", container);

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(container)
            .into_paginator()
            .send();

        let mut entries = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(request_error)?;
            entries.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(|key| ObjectEntry {
                        key: key.to_string(),
                    }),
            );
        }

        Ok(entries)
    }
}

/// Handle to one S3 object
struct S3Object {
    client: Client,
    bucket: String,
    key: String,
}

#[async_trait]
impl ObjectHandle for S3Object {
    fn key(&self) -> &str {
        &self.key
    }

    async fn write_all(&self, data: Bytes) -> Result<(), ProviderError> {
        debug!("PUT {}/{} ({} bytes)", self.bucket, self.key, data.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(S3ByteStream::from(data))
            .send()
            .await
            .map_err(request_error)?;

        Ok(())
    }

    async fn open_read_stream(&self) -> Result<ByteStream, ProviderError> {
        debug!("GET {}/{}", self.bucket, self.key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    ProviderError::BlobNotFound(self.key.clone())
                } else {
                    request_error(err)
                }
            })?;

        Ok(Box::pin(ReaderStream::new(response.body.into_async_read())))
    }

    async fn delete_if_exists(&self) -> Result<DeleteOutcome, ProviderError> {
        // DeleteObject succeeds on missing keys, so existence is checked first
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
        {
            Ok(_) => {}
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                debug!("DELETE {}/{} skipped, object absent", self.bucket, self.key);
                return Ok(DeleteOutcome { succeeded: false });
            }
            Err(err) => return Err(request_error(err)),
        }

        debug!("DELETE {}/{}", self.bucket, self.key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(request_error)?;

        Ok(DeleteOutcome { succeeded: true })
    }

    async fn sign_read_url(&self, window: SignedUrlWindow) -> Result<String, ProviderError> {
        let expires_in = window
            .duration()
            .to_std()
            .map_err(|e| ProviderError::Signing(format!("invalid validity window: {}", e)))?;

        let presigning = PresigningConfig::builder()
            .start_time(SystemTime::from(window.starts_on))
            .expires_in(expires_in)
            .build()
            .map_err(|e| ProviderError::Signing(e.to_string()))?;

        // Only GetObject is presigned, so the URL grants read access and nothing else
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .presigned(presigning)
            .await
            .map_err(|e| ProviderError::Signing(DisplayErrorContext(e).to_string()))?;

        Ok(request.uri().to_string())
    }
}
