//! Blob Service configuration types

use thiserror::Error;

/// Default container name
pub const DEFAULT_CONTAINER_NAME: &str = "blobgate";
/// Default upper bound for one upload request body (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid container name '{name}': {reason}")]
    InvalidContainerName { name: String, reason: &'static str },

    #[error("max upload size must be greater than zero")]
    ZeroUploadLimit,
}

/// Deployment-wide settings handed to the blob handlers at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobConfig {
    /// Container used by every HTTP operation
    pub default_container: String,

    /// Largest accepted upload request body, in bytes
    pub max_upload_bytes: usize,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            default_container: DEFAULT_CONTAINER_NAME.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl BlobConfig {
    pub fn new(
        default_container: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let default_container = default_container.into();
        validate_container_name(&default_container)?;

        if max_upload_bytes == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }

        Ok(Self {
            default_container,
            max_upload_bytes,
        })
    }
}

/// Check a container name against the rules shared by S3 buckets and Azure
/// containers: 3-63 characters of lowercase letters, digits and hyphens,
/// starting and ending with a letter or digit, no consecutive hyphens.
pub fn validate_container_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidContainerName {
        name: name.to_string(),
        reason,
    };

    if !(3..=63).contains(&name.len()) {
        return Err(invalid("must be between 3 and 63 characters long"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("only lowercase letters, digits and hyphens are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    if name.contains("--") {
        return Err(invalid("consecutive hyphens are not allowed"));
    }

    Ok(())
}
