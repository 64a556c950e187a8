//! Core type definitions for Quire.
//!
//! This crate defines the identifier types shared by every layer:
//! - [`EntityId`]: local primary key of a persisted entity (UUID v7)
//! - [`RemoteId`]: the globally unique URI a peer uses to address an object
//!
//! Schemas, typed objects and entities live in `quire-model`.

mod ids;

pub use ids::{EntityId, RemoteId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid remote id {value:?}: {source}")]
    InvalidRemoteId {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("remote id {0:?} is not dereferenceable over http(s)")]
    UnsupportedScheme(String),
}
