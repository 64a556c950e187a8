//! Error types for the federation layer.

use quire_model::{RegistryError, SchemaValidationError};
use quire_storage::StorageError;
use thiserror::Error;

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;

/// Errors surfaced by resolution and mapping.
#[derive(Debug, Error)]
pub enum FederationError {
    /// The document does not match its declared schema.
    #[error("schema validation failed: {0}")]
    SchemaValidation(#[from] SchemaValidationError),

    /// The document or its host could not be retrieved.
    #[error("remote fetch failed: {0}")]
    RemoteFetch(#[from] FetchError),

    /// No mapping from the object's type onto the target entity type.
    #[error("cannot map {object_type} onto {entity_type}")]
    UnsupportedTarget {
        entity_type: String,
        object_type: String,
    },

    /// A new entity needs an absolute identifier to be stored under.
    #[error("{entity_type} needs an absolute identifier, got {identifier:?}")]
    IdentityRequired {
        entity_type: String,
        identifier: String,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A local identifier with no stored entity behind it.
    #[error("no local entity for {0}")]
    UnknownLocal(String),

    /// The identifier is already being resolved further up the chain.
    #[error("reference cycle through {0}")]
    ReferenceCycle(String),

    #[error("reference chain deeper than {max_depth} at {identifier}")]
    DepthExceeded { identifier: String, max_depth: usize },

    /// An entity type or family is not in the catalog.
    #[error("catalog error: {0}")]
    Registry(#[from] RegistryError),
}

/// Failures of the remote fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("network error fetching {uri}: {message}")]
    Network { uri: String, message: String },

    #[error("{uri} returned HTTP {status}")]
    Status { uri: String, status: u16 },

    #[error("{uri} served unexpected content type {content_type:?}")]
    ContentType {
        uri: String,
        content_type: Option<String>,
    },

    #[error("unreadable body from {uri}: {message}")]
    Body { uri: String, message: String },

    #[error("{uri} is larger than {limit} bytes")]
    TooLarge { uri: String, limit: u64 },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Failures loading a [`crate::FederationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures handing work to the background task collaborator.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task queue full")]
    Full,

    #[error("task queue closed")]
    Closed,
}
