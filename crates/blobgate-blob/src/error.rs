//! Error types for the Blob service

use blobgate_core::problemdetails::{self, Problem};
use thiserror::Error;

/// Errors that can occur in the Blob service
///
/// Every variant names the operation that failed and carries the underlying
/// provider message. All of them reach clients as `400 Bad Request`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("Error getting blob client: {0}.")]
    ClientResolution(String),

    #[error("Failed to upload file {file_name}: {reason}.")]
    Upload { file_name: String, reason: String },

    #[error("Failed to get file {file_name}: {reason}.")]
    Fetch { file_name: String, reason: String },

    #[error("Failed to delete file {file_name}: {reason}.")]
    Delete { file_name: String, reason: String },

    #[error("Failed to generate temporary URL: {0}.")]
    TemporaryUrl(String),

    #[error("Failed to list files: {0}.")]
    List(String),

    #[error("Invalid file name '{0}'.")]
    InvalidFileName(String),

    #[error("No file was provided in the '{0}' field.")]
    MissingFile(String),

    #[error("Malformed upload: {0}.")]
    MalformedUpload(String),

    /// Query string or path segment could not be extracted
    #[error("Failed to {operation}: {reason}.")]
    InvalidRequest {
        operation: &'static str,
        reason: String,
    },
}

impl BlobError {
    /// Message to embed when this error is wrapped by an outer operation
    pub fn reason(&self) -> String {
        self.to_string().trim_end_matches('.').to_string()
    }

    fn title(&self) -> &'static str {
        match self {
            BlobError::ClientResolution(_) => "Blob Client Unavailable",
            BlobError::Upload { .. } => "Upload Failed",
            BlobError::Fetch { .. } => "File Not Available",
            BlobError::Delete { .. } => "Delete Failed",
            BlobError::TemporaryUrl(_) => "Temporary URL Failed",
            BlobError::List(_) => "List Failed",
            BlobError::InvalidFileName(_) => "Invalid File Name",
            BlobError::MissingFile(_) => "Missing File",
            BlobError::MalformedUpload(_) => "Malformed Upload",
            BlobError::InvalidRequest { .. } => "Invalid Request",
        }
    }
}

impl From<BlobError> for Problem {
    fn from(error: BlobError) -> Self {
        problemdetails::bad_request(error.title(), error.to_string())
    }
}
