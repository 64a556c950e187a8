//! Typed object model for Quire.
//!
//! Defines everything needed to turn an inbound federation document into
//! something the rest of the system can persist:
//! - [`ObjectSchema`] / [`FieldSpec`]: declared shape of each wire object type
//! - [`SchemaRegistry`]: discriminator → schema catalog, built once at startup
//! - [`WireCodec`] / [`encode`]: raw JSON ⇄ [`TypedObject`]
//! - [`Entity`]: a persisted record addressed by `remote_id` / `origin_id`
//! - [`EntityType`] / [`EntityFamily`] / [`EntityCatalog`]: persisted shapes
//!   and the polymorphic families identifiers are searched across
//!
//! The built-in ActivityStreams/book vocabulary lives in [`vocab`].

mod codec;
mod entity;
mod entity_type;
mod error;
mod object;
mod registry;
mod schema;
pub mod vocab;

pub use codec::{WireCodec, encode};
pub use entity::{Entity, NewEntity};
pub use entity_type::{EntityFamily, EntityField, EntityFieldKind, EntityType};
pub use error::{CodecResult, RegistryError, SchemaValidationError};
pub use object::{Attachment, FieldValue, TypedObject};
pub use registry::{EntityCatalog, SchemaRegistry};
pub use schema::{FieldKind, FieldSpec, ObjectSchema, Presence};

/// Wire key holding an object's identifier.
pub const ID_FIELD: &str = "id";
/// Wire key holding an object's discriminator.
pub const TYPE_FIELD: &str = "type";
