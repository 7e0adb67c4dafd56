//! Blob Service implementation

mod blob_service;
mod config;
mod resolver;

pub use blob_service::{
    generate_object_key, BlobInfo, BlobService, KEY_SEPARATOR, UPLOAD_SUCCESS_MESSAGE,
};
pub use config::{
    validate_container_name, BlobConfig, ConfigError, DEFAULT_CONTAINER_NAME,
    DEFAULT_MAX_UPLOAD_BYTES,
};
pub use resolver::BlobClientResolver;
