//! Error types for the RoadCrew bot core

use std::time::Duration;
use thiserror::Error;

/// Result type alias for RoadCrew operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Errors talking to the storage backend (Google Drive)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage token rejected. Run `roadcrew init` to set a fresh token.")]
    Unauthorized,

    #[error("Access denied to storage object: {0}")]
    Forbidden(String),

    #[error("Storage object not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            StorageError::Network("Failed to connect to storage backend".to_string())
        } else {
            StorageError::Network(err.to_string())
        }
    }
}

/// Folder-resolution failures surfaced to callers.
///
/// A stale cached id is not an error: the resolver invalidates it and falls
/// back to search/create internally. Only these two outcomes escape.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("storage backend unavailable resolving '{name}' under {parent_id}: {detail}")]
    BackendUnavailable {
        name: String,
        parent_id: String,
        detail: String,
    },

    #[error("storage backend returned a malformed response resolving '{name}' under {parent_id}: {detail}")]
    AmbiguousState {
        name: String,
        parent_id: String,
        detail: String,
    },
}

impl ResolveError {
    /// Map a storage error for the `(name, parent_id)` resolution being
    /// attempted. Malformed responses become `AmbiguousState` and are not
    /// retried; everything else is a transport-level `BackendUnavailable`.
    pub fn from_storage(err: StorageError, name: &str, parent_id: &str) -> Self {
        match err {
            StorageError::InvalidResponse(detail) => ResolveError::AmbiguousState {
                name: name.to_string(),
                parent_id: parent_id.to_string(),
                detail,
            },
            other => ResolveError::BackendUnavailable {
                name: name.to_string(),
                parent_id: parent_id.to_string(),
                detail: other.to_string(),
            },
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `roadcrew init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Root folder not configured. Run `roadcrew init` to set the Drive root folder id.")]
    MissingRootFolder,

    #[error("Storage token not configured. Run `roadcrew init` to set up your token.")]
    MissingToken,

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
