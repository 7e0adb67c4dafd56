//! HTTP handlers for Blob service

pub mod handler;
pub mod types;

pub use handler::{build_router, configure_routes, BlobApiDoc};
pub use types::*;
