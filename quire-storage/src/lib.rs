//! SQLite storage layer for Quire.
//!
//! Implements the two persistence collaborators the federation layer
//! writes through:
//!
//! - [`EntityRepository`] / [`EntityStore`]: entities as JSON rows keyed
//!   by [`quire_types::EntityId`], unique on `remote_id` (and on
//!   `origin_id` when set)
//! - [`AttachmentStore`] / [`BlobStore`]: fetched binaries stored per
//!   entity field, with a sniffed format and a content hash
//!
//! Both stores can share one connection via `open_with_conn`.

mod blob_store;
mod entity_store;
mod error;
mod repository;

pub use blob_store::{BlobMetadata, BlobStore};
pub use entity_store::EntityStore;
pub use error::{StorageError, StorageResult};
pub use repository::{AttachmentStore, EntityRepository, Lookup, StoredAttachment};

use std::sync::{Arc, Mutex, MutexGuard};

/// Open a SQLite database file in WAL mode with a 5s busy timeout,
/// creating parent directories as needed.
pub fn open_sqlite(path: &std::path::Path) -> StorageResult<rusqlite::Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = rusqlite::Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
    Ok(conn)
}

pub(crate) fn lock(conn: &Arc<Mutex<rusqlite::Connection>>) -> StorageResult<MutexGuard<'_, rusqlite::Connection>> {
    conn.lock().map_err(|_| StorageError::LockPoisoned)
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
