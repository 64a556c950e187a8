//! Error types for the object model.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, SchemaValidationError>;

/// A document does not fit the schema it was decoded against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaValidationError {
    /// A required field is absent (or null).
    #[error("{schema}: missing required field `{field}`")]
    MissingField { schema: String, field: String },

    /// A field is present but holds the wrong shape of value.
    #[error("{schema}: field `{field}` must be {expected}")]
    InvalidValue {
        schema: String,
        field: String,
        expected: &'static str,
    },

    /// No schema is registered for the document's discriminator.
    #[error("no schema registered for type {0:?}")]
    UnknownType(String),

    /// The document (or an embedded sub-document) is not a JSON object.
    #[error("{schema}: document is not a JSON object")]
    NotAnObject { schema: String },

    /// `id` or `type` decoded to an empty string.
    #[error("{schema}: `{field}` must be a non-empty string")]
    EmptyIdentity { schema: String, field: &'static str },
}

/// Errors raised while building the schema registry or entity catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("schema {0:?} is already registered")]
    DuplicateSchema(String),

    #[error("schema {schema:?} extends unknown schema {parent:?}")]
    UnknownParent { schema: String, parent: String },

    #[error("entity type {0:?} is already registered")]
    DuplicateEntityType(String),

    #[error("unknown entity type {0:?}")]
    UnknownEntityType(String),

    #[error("entity family {0:?} is already registered")]
    DuplicateFamily(String),
}
