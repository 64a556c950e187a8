//! Lookup of already-persisted entities across a family.

use std::sync::Arc;

use quire_model::{Entity, EntityFamily};
use quire_storage::{EntityRepository, Lookup, StorageResult};
use tracing::debug;

/// Finds the stored entity an identifier refers to, if any.
#[derive(Clone)]
pub struct IdentityResolver {
    repository: Arc<dyn EntityRepository>,
}

impl IdentityResolver {
    pub fn new(repository: Arc<dyn EntityRepository>) -> Self {
        Self { repository }
    }

    /// Searches every member of `family`, base type first, matching
    /// `identifier` against both `remote_id` and `origin_id`.
    ///
    /// `Ok(None)` means nothing matched.
    pub fn find_existing(&self, family: &EntityFamily, identifier: &str) -> StorageResult<Option<Entity>> {
        for member in family.members() {
            for lookup in [Lookup::RemoteId, Lookup::OriginId] {
                if let Some(entity) = self.repository.query(member, lookup, identifier)? {
                    debug!("Resolved {} to {} {} ({:?})", identifier, member, entity.id, lookup);
                    return Ok(Some(entity));
                }
            }
        }
        Ok(None)
    }
}
