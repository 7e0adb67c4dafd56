//! Provider connection string parsing
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs with
//! case-insensitive keys, e.g.
//! `Endpoint=http://localhost:9000;Region=us-east-1;AccessKeyId=minio;SecretAccessKey=secret`.
//! `UseInMemoryStorage=true` selects the in-memory provider instead.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Region used when the connection string does not name one
pub const DEFAULT_REGION: &str = "us-east-1";

const KEY_IN_MEMORY: &str = "useinmemorystorage";
const KEY_ENDPOINT: &str = "endpoint";
const KEY_REGION: &str = "region";
const KEY_ACCESS_KEY_ID: &str = "accesskeyid";
const KEY_SECRET_ACCESS_KEY: &str = "secretaccesskey";
const KEY_FORCE_PATH_STYLE: &str = "forcepathstyle";

const KNOWN_KEYS: &[&str] = &[
    KEY_IN_MEMORY,
    KEY_ENDPOINT,
    KEY_REGION,
    KEY_ACCESS_KEY_ID,
    KEY_SECRET_ACCESS_KEY,
    KEY_FORCE_PATH_STYLE,
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("connection string is empty")]
    Empty,

    #[error("malformed segment '{0}', expected Key=Value")]
    MalformedSegment(String),

    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("key '{0}' is given more than once")]
    DuplicateKey(String),

    #[error("missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("invalid boolean '{value}' for key '{key}'")]
    InvalidBool { key: String, value: String },

    #[error("invalid endpoint '{0}': {1}")]
    InvalidEndpoint(String, String),
}

/// Settings for an S3-compatible provider
#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub force_path_style: bool,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// Parsed provider connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionString {
    InMemory,
    S3(S3Settings),
}

impl ConnectionString {
    /// Short provider name for log lines
    pub fn provider_name(&self) -> &'static str {
        match self {
            ConnectionString::InMemory => "memory",
            ConnectionString::S3(_) => "s3",
        }
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut pairs = parse_pairs(raw)?;

        if let Some(value) = pairs.remove(KEY_IN_MEMORY) {
            if parse_bool(KEY_IN_MEMORY, &value)? {
                return Ok(ConnectionString::InMemory);
            }
        }

        let endpoint = match pairs.remove(KEY_ENDPOINT) {
            Some(endpoint) => {
                Url::parse(&endpoint).map_err(|e| {
                    ConnectionStringError::InvalidEndpoint(endpoint.clone(), e.to_string())
                })?;
                Some(endpoint)
            }
            None => None,
        };

        let force_path_style = match pairs.remove(KEY_FORCE_PATH_STYLE) {
            Some(value) => parse_bool(KEY_FORCE_PATH_STYLE, &value)?,
            // Custom endpoints (MinIO, RustFS, ...) rarely serve virtual-host buckets
            None => endpoint.is_some(),
        };

        Ok(ConnectionString::S3(S3Settings {
            endpoint,
            region: pairs
                .remove(KEY_REGION)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key_id: pairs
                .remove(KEY_ACCESS_KEY_ID)
                .ok_or(ConnectionStringError::MissingKey("AccessKeyId"))?,
            secret_access_key: pairs
                .remove(KEY_SECRET_ACCESS_KEY)
                .ok_or(ConnectionStringError::MissingKey("SecretAccessKey"))?,
            force_path_style,
        }))
    }
}

fn parse_pairs(raw: &str) -> Result<HashMap<String, String>, ConnectionStringError> {
    let mut pairs = HashMap::new();

    for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key.is_empty() || value.is_empty() {
            return Err(ConnectionStringError::MalformedSegment(segment.to_string()));
        }
        if !KNOWN_KEYS.contains(&key.as_str()) {
            return Err(ConnectionStringError::UnknownKey(key));
        }
        if pairs.insert(key.clone(), value.to_string()).is_some() {
            return Err(ConnectionStringError::DuplicateKey(key));
        }
    }

    if pairs.is_empty() {
        return Err(ConnectionStringError::Empty);
    }
    Ok(pairs)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConnectionStringError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConnectionStringError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
