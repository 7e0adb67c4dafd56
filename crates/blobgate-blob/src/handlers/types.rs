//! Request and response types for Blob HTTP handlers

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::services::{BlobConfig, BlobInfo, BlobService};

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "myfile";

/// Application state for blob handlers
pub struct BlobAppState {
    pub blob_service: Arc<BlobService>,
    pub config: BlobConfig,
}

/// Multipart body of an upload
#[allow(dead_code)] // documentation only, the handler reads the multipart stream
#[derive(ToSchema)]
pub struct UploadForm {
    /// The file to store
    #[schema(value_type = String, format = Binary)]
    pub myfile: Vec<u8>,
}

/// Query parameters naming one blob
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileQuery {
    /// Object key returned by the upload (`fileName` is accepted too)
    #[serde(alias = "fileName")]
    #[param(example = "0b6f1c5e-8a3d-4c2b-9f0e-1d2c3b4a5f6e_report.pdf")]
    pub filename: String,
}

/// A stored blob with its temporary read URL
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlobResponse {
    /// Outcome of the operation
    #[schema(example = "File uploaded successfully")]
    pub message: String,
    /// Object key inside the container
    #[schema(example = "0b6f1c5e-8a3d-4c2b-9f0e-1d2c3b4a5f6e_report.pdf")]
    pub file_name: String,
    /// Container holding the blob
    #[schema(example = "blobgate")]
    pub container_name: String,
    /// Read-only URL, valid 100 minutes either side of generation
    #[schema(example = "https://s3.amazonaws.com/blobgate/0b6f..._report.pdf?X-Amz-Expires=12000")]
    pub url: String,
}

impl From<BlobInfo> for BlobResponse {
    fn from(info: BlobInfo) -> Self {
        Self {
            message: info.message,
            file_name: info.file_name,
            container_name: info.container_name,
            url: info.url,
        }
    }
}
