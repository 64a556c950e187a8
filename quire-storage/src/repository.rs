//! Collaborator traits the federation layer persists through.

use quire_model::{Entity, EntityType, NewEntity};
use quire_types::EntityId;
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// Which identifier column a lookup matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    RemoteId,
    OriginId,
}

impl Lookup {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::RemoteId => "remote_id",
            Self::OriginId => "origin_id",
        }
    }
}

/// Persistent entity storage.
pub trait EntityRepository: Send + Sync {
    /// Inserts a new entity of `entity_type`.
    ///
    /// The store assigns the local id and, for types with a `local_path`,
    /// mints the canonical `remote_id`. Duplicate identifiers fail with
    /// [`crate::StorageError::Conflict`].
    fn create(&self, entity_type: &EntityType, new: NewEntity) -> StorageResult<Entity>;

    /// Finds the entity of exactly `entity_type` whose `lookup` column equals `value`.
    fn query(&self, entity_type: &str, lookup: Lookup, value: &str) -> StorageResult<Option<Entity>>;

    fn get(&self, id: &EntityId) -> StorageResult<Option<Entity>>;

    /// Writes `data` and `origin_id` back and bumps `modified_at`.
    fn save(&self, entity: &mut Entity) -> StorageResult<()>;

    fn count(&self, entity_type: &str) -> StorageResult<usize>;
}

/// Where fetched attachment bytes end up.
pub trait AttachmentStore: Send + Sync {
    /// Stores `bytes` as the `field` attachment of `entity`, replacing any
    /// earlier version.
    fn store(
        &self,
        entity: &Entity,
        field: &str,
        bytes: &[u8],
        format_hint: Option<&str>,
    ) -> StorageResult<StoredAttachment>;
}

/// Result of storing an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttachment {
    /// Locally addressable key, written into the entity's column.
    pub key: String,
    /// File extension style format (`jpg`, `png`, ...), if known.
    pub format: Option<String>,
    pub size: u64,
    /// Hex SHA-256 of the bytes.
    pub content_hash: String,
}
