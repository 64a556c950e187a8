//! Shared plumbing for the `quire` operator binary.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use quire_federation::{Federation, FederationConfig, FederationTask, HttpFetcher, TaskDispatcher};
use quire_model::{SchemaRegistry, encode};
use quire_storage::{BlobStore, EntityStore};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// Loads the config file if given, then applies command-line overrides.
pub fn load_config(path: Option<&Path>, domain: Option<&str>) -> Result<FederationConfig> {
    let mut config = match path {
        Some(path) => FederationConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => FederationConfig::default(),
    };
    if let Some(domain) = domain {
        config.local_domain = domain.to_string();
    }
    Ok(config)
}

/// Reads a JSON document from disk.
pub fn read_document(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Validates a document against the built-in schemas and returns its
/// normalized wire form.
pub fn normalize(raw: &Value) -> Result<Value> {
    let object = SchemaRegistry::global()
        .codec()
        .decode_document(raw)
        .context("Document failed validation")?;
    Ok(encode(&object))
}

/// One line per registered wire type, followed by its ancestors:
/// `Quotation < Comment < Note < Object`.
pub fn describe_types(registry: &SchemaRegistry) -> Vec<String> {
    registry
        .names()
        .into_iter()
        .filter_map(|name| registry.get(name))
        .map(|schema| {
            std::iter::once(schema.name.as_str())
                .chain(schema.lineage.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" < ")
        })
        .collect()
}

/// Opens the SQLite database at `db` and wires a federation layer onto it.
pub fn open_federation(
    config: FederationConfig,
    db: &Path,
    tasks: Arc<dyn TaskDispatcher>,
) -> Result<Federation> {
    let store = EntityStore::open(db, &config.local_domain)
        .with_context(|| format!("Failed to open database {}", db.display()))?;
    let blobs = BlobStore::open_with_conn(store.connection())?;
    let fetcher = HttpFetcher::new(&config)?;
    Ok(Federation::new(config, Arc::new(store), Arc::new(blobs), Arc::new(fetcher)).with_tasks(tasks))
}

/// Drains background tasks, logging each one. This tool has no worker
/// pool, so tasks are only reported.
pub fn spawn_task_logger(mut rx: mpsc::Receiver<FederationTask>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut seen = 0;
        while let Some(task) = rx.recv().await {
            seen += 1;
            match task {
                FederationTask::RefreshRemoteServer { host, remote_id, .. } => {
                    info!("Server refresh queued for {} (via {})", host, remote_id);
                }
            }
        }
        seen
    })
}
