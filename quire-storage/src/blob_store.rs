//! Namespace-scoped blob storage backing entity attachments.

use std::path::Path;
use std::sync::{Arc, Mutex};

use quire_model::Entity;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::repository::{AttachmentStore, StoredAttachment};
use crate::{lock, now_millis, open_sqlite};

/// Metadata for one stored blob.
#[derive(Debug, Clone, Serialize)]
pub struct BlobMetadata {
    pub namespace: String,
    pub blob_id: String,
    pub size: u64,
    pub content_hash: String,
    pub format: Option<String>,
    pub metadata_json: Option<String>,
    pub created_at: i64,
}

/// Blobs keyed by `(namespace, blob_id)`.
pub struct BlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl BlobStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_sqlite(path)?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_conn(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> StorageResult<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS blobs (
                namespace TEXT NOT NULL,
                blob_id TEXT NOT NULL,
                data BLOB NOT NULL,
                size INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                format TEXT,
                metadata_json TEXT,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, blob_id)
            );
            ",
        )?;
        Ok(())
    }

    /// Stores (or replaces) a blob.
    pub fn store(
        &self,
        namespace: &str,
        blob_id: &str,
        data: &[u8],
        format: Option<&str>,
        metadata_json: Option<&str>,
    ) -> StorageResult<BlobMetadata> {
        let meta = BlobMetadata {
            namespace: namespace.to_string(),
            blob_id: blob_id.to_string(),
            size: data.len() as u64,
            content_hash: hex::encode(Sha256::digest(data)),
            format: format.map(str::to_string),
            metadata_json: metadata_json.map(str::to_string),
            created_at: now_millis(),
        };
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO blobs
                (namespace, blob_id, data, size, content_hash, format, metadata_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                meta.namespace,
                meta.blob_id,
                data,
                meta.size as i64,
                meta.content_hash,
                meta.format,
                meta.metadata_json,
                meta.created_at,
            ],
        )?;
        Ok(meta)
    }

    /// Reads a blob's bytes.
    pub fn read(&self, namespace: &str, blob_id: &str) -> StorageResult<Vec<u8>> {
        let conn = lock(&self.conn)?;
        conn.query_row(
            "SELECT data FROM blobs WHERE namespace = ?1 AND blob_id = ?2",
            params![namespace, blob_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("{namespace}/{blob_id}")))
    }

    /// Reads the bytes behind a [`StoredAttachment::key`].
    pub fn read_key(&self, key: &str) -> StorageResult<Vec<u8>> {
        let (namespace, blob_id) = split_key(key)?;
        self.read(namespace, blob_id)
    }

    pub fn metadata(&self, namespace: &str, blob_id: &str) -> StorageResult<Option<BlobMetadata>> {
        let conn = lock(&self.conn)?;
        let meta = conn
            .query_row(
                "SELECT namespace, blob_id, size, content_hash, format, metadata_json, created_at
                 FROM blobs WHERE namespace = ?1 AND blob_id = ?2",
                params![namespace, blob_id],
                row_to_metadata,
            )
            .optional()?;
        Ok(meta)
    }

    /// Lists every blob in a namespace, ordered by id.
    pub fn list(&self, namespace: &str) -> StorageResult<Vec<BlobMetadata>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT namespace, blob_id, size, content_hash, format, metadata_json, created_at
             FROM blobs WHERE namespace = ?1 ORDER BY blob_id",
        )?;
        let rows = stmt.query_map(params![namespace], row_to_metadata)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn row_to_metadata(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlobMetadata> {
    let size: i64 = row.get(2)?;
    Ok(BlobMetadata {
        namespace: row.get(0)?,
        blob_id: row.get(1)?,
        size: size as u64,
        content_hash: row.get(3)?,
        format: row.get(4)?,
        metadata_json: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn split_key(key: &str) -> StorageResult<(&str, &str)> {
    key.split_once('/')
        .filter(|(ns, id)| !ns.is_empty() && !id.is_empty())
        .ok_or_else(|| StorageError::InvalidData(format!("malformed attachment key {key:?}")))
}

/// Format of `bytes`: sniffed from magic numbers, else derived from the hint.
///
/// Hints may be a MIME type (`image/jpeg`) or a bare extension (`png`).
fn detect_format(bytes: &[u8], hint: Option<&str>) -> Option<String> {
    if let Some(kind) = infer::get(bytes) {
        return Some(kind.extension().to_string());
    }
    let hint = hint?.split(';').next()?.trim();
    let format = hint.rsplit('/').next().unwrap_or(hint).to_ascii_lowercase();
    match format.as_str() {
        "" | "octet-stream" => None,
        "jpeg" => Some("jpg".to_string()),
        _ => Some(format),
    }
}

impl AttachmentStore for BlobStore {
    fn store(
        &self,
        entity: &Entity,
        field: &str,
        bytes: &[u8],
        format_hint: Option<&str>,
    ) -> StorageResult<StoredAttachment> {
        let format = detect_format(bytes, format_hint);
        let blob_id = format!("{}/{}", entity.id, field);
        let metadata = serde_json::json!({
            "remote_id": entity.remote_id,
            "field": field,
        })
        .to_string();
        let meta = BlobStore::store(
            self,
            &entity.entity_type,
            &blob_id,
            bytes,
            format.as_deref(),
            Some(&metadata),
        )?;
        let key = format!("{}/{}", meta.namespace, meta.blob_id);
        debug!("Stored attachment {} ({} bytes)", key, meta.size);
        Ok(StoredAttachment {
            key,
            format,
            size: meta.size,
            content_hash: meta.content_hash,
        })
    }
}
