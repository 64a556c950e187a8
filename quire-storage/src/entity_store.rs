//! SQLite-backed [`EntityRepository`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use quire_model::{Entity, EntityType, NewEntity};
use quire_types::{EntityId, RemoteId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::repository::{EntityRepository, Lookup};
use crate::{lock, now_millis, open_sqlite};

const COLUMNS: &str = "id, entity_type, remote_id, origin_id, data, created_at, modified_at";

/// Entity rows stored as JSON, one table for every entity type.
pub struct EntityStore {
    conn: Arc<Mutex<Connection>>,
    local_domain: String,
}

impl EntityStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path, local_domain: &str) -> StorageResult<Self> {
        let conn = open_sqlite(path)?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)), local_domain)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory(local_domain: &str) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)), local_domain)
    }

    /// Uses an existing connection, e.g. one shared with a [`crate::BlobStore`].
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>, local_domain: &str) -> StorageResult<Self> {
        let store = Self {
            conn,
            local_domain: local_domain.to_string(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// The underlying connection, for sharing with other stores.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                remote_id TEXT NOT NULL UNIQUE,
                origin_id TEXT,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                modified_at INTEGER NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_origin
                ON entities(origin_id) WHERE origin_id IS NOT NULL;

            CREATE INDEX IF NOT EXISTS idx_entities_type
                ON entities(entity_type);
            ",
        )?;
        Ok(())
    }

    /// Decides the stored `(remote_id, origin_id)` pair for a new row.
    fn assign_identifiers(
        &self,
        entity_type: &EntityType,
        id: &EntityId,
        presented: Option<String>,
    ) -> StorageResult<(String, Option<String>)> {
        let minted = match &entity_type.local_path {
            Some(path) => Some(
                RemoteId::local(&self.local_domain, path, id)
                    .map_err(|e| StorageError::InvalidData(e.to_string()))?
                    .to_string(),
            ),
            None => None,
        };

        match (presented, minted) {
            (Some(presented), Some(local)) if entity_type.tracks_origin && !self.is_local(&presented) => {
                Ok((local, Some(presented)))
            }
            (Some(presented), _) => Ok((presented, None)),
            (None, Some(local)) => Ok((local, None)),
            (None, None) => Err(StorageError::InvalidData(format!(
                "entity type {} cannot mint a local identifier",
                entity_type.name
            ))),
        }
    }

    fn is_local(&self, identifier: &str) -> bool {
        RemoteId::parse(identifier).is_ok_and(|id| id.is_on_domain(&self.local_domain))
    }
}

type RawRow = (String, String, String, Option<String>, String, i64, i64);

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn build_entity(
    (id, entity_type, remote_id, origin_id, data, created_at, modified_at): RawRow,
) -> StorageResult<Entity> {
    let id = EntityId::parse(&id)
        .map_err(|e| StorageError::InvalidData(format!("invalid entity id {id:?}: {e}")))?;
    Ok(Entity {
        id,
        entity_type,
        remote_id,
        origin_id,
        data: serde_json::from_str(&data)?,
        created_at,
        modified_at,
    })
}

impl EntityRepository for EntityStore {
    fn create(&self, entity_type: &EntityType, new: NewEntity) -> StorageResult<Entity> {
        let id = EntityId::new();
        let (remote_id, origin_id) = self.assign_identifiers(entity_type, &id, new.remote_id)?;
        let data = if new.data.is_object() {
            new.data
        } else {
            serde_json::Value::Object(serde_json::Map::new())
        };
        let now = now_millis();

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO entities (id, entity_type, remote_id, origin_id, data, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                id.to_string(),
                entity_type.name,
                remote_id,
                origin_id,
                serde_json::to_string(&data)?,
                now,
            ],
        )
        .map_err(|e| StorageError::from_insert(e, origin_id.as_deref().unwrap_or(&remote_id)))?;

        debug!("Created {} {} ({})", entity_type.name, id, remote_id);
        Ok(Entity {
            id,
            entity_type: entity_type.name.clone(),
            remote_id,
            origin_id,
            data,
            created_at: now,
            modified_at: now,
        })
    }

    fn query(&self, entity_type: &str, lookup: Lookup, value: &str) -> StorageResult<Option<Entity>> {
        let conn = lock(&self.conn)?;
        let sql = format!(
            "SELECT {COLUMNS} FROM entities WHERE entity_type = ?1 AND {} = ?2",
            lookup.column()
        );
        let row = conn
            .query_row(&sql, params![entity_type, value], row_to_entity)
            .optional()?;
        row.map(build_entity).transpose()
    }

    fn get(&self, id: &EntityId) -> StorageResult<Option<Entity>> {
        let conn = lock(&self.conn)?;
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM entities WHERE id = ?1"),
                params![id.to_string()],
                row_to_entity,
            )
            .optional()?;
        row.map(build_entity).transpose()
    }

    fn save(&self, entity: &mut Entity) -> StorageResult<()> {
        let now = now_millis().max(entity.modified_at);
        let conn = lock(&self.conn)?;
        let updated = conn
            .execute(
                "UPDATE entities SET data = ?1, origin_id = ?2, modified_at = ?3 WHERE id = ?4",
                params![
                    serde_json::to_string(&entity.data)?,
                    entity.origin_id,
                    now,
                    entity.id.to_string(),
                ],
            )
            .map_err(|e| StorageError::from_insert(e, &entity.remote_id))?;
        if updated == 0 {
            return Err(StorageError::NotFound(entity.id.to_string()));
        }
        entity.modified_at = now;
        Ok(())
    }

    fn count(&self, entity_type: &str) -> StorageResult<usize> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE entity_type = ?1",
            params![entity_type],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
