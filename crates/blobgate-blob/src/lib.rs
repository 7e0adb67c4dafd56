//! blobgate-blob: HTTP facade over object storage
//!
//! Upload, download, delete and list files kept in a provider container,
//! and hand out short-lived read-only signed URLs. The provider (S3 or
//! in-memory) sits behind the traits in [`provider`].

pub mod error;
pub mod handlers;
pub mod provider;
pub mod services;

pub use error::BlobError;
pub use handlers::{build_router, configure_routes, BlobApiDoc, BlobAppState};
pub use services::{BlobConfig, BlobService};
