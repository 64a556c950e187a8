//! Federation object layer for Quire.
//!
//! Turns identifiers and inbound documents from remote peers into
//! persisted entities.
//!
//! # Components
//!
//! - **Identity Resolver** ([`IdentityResolver`]): finds the stored entity
//!   an identifier refers to, across every member of an entity family and
//!   both identifier columns
//! - **Remote Fetcher** ([`RemoteFetcher`], [`HttpFetcher`]): content
//!   negotiated GETs for documents and attachments
//! - **Resolution Orchestrator** ([`Federation::resolve`]): cache lookup,
//!   then fetch, decode and map on a miss, one fetch per identifier at a time
//! - **Model Mapper** ([`Federation::apply`], [`Federation::map_document`]):
//!   projects a typed object onto a new or existing entity
//! - **Background tasks** ([`TaskDispatcher`]): follow-up work scheduled
//!   after a remote entity is materialized
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use quire_federation::{Federation, FederationConfig, HttpFetcher};
//! use quire_storage::{BlobStore, EntityStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FederationConfig::default();
//! let store = EntityStore::open_in_memory(&config.local_domain)?;
//! let blobs = BlobStore::open_with_conn(store.connection())?;
//! let fetcher = HttpFetcher::new(&config)?;
//! let federation = Federation::new(config, Arc::new(store), Arc::new(blobs), Arc::new(fetcher));
//!
//! let users = federation.family("user")?;
//! let user = federation.resolve(&users, "https://example.com/user/mouse").await?;
//! println!("{}", user.id);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod fetcher;
mod mapper;
mod orchestrator;
mod resolver;
mod tasks;

pub use config::FederationConfig;
pub use error::{ConfigError, FederationError, FederationResult, FetchError, TaskError};
pub use fetcher::{ACTIVITY_ACCEPT, FetchedAttachment, FetchedDocument, HttpFetcher, RemoteFetcher};
pub use orchestrator::Federation;
pub use resolver::IdentityResolver;
pub use tasks::{ChannelDispatcher, FederationTask, NoopDispatcher, TaskDispatcher};
