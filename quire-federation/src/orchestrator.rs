//! Identifier → entity resolution, fetching and materializing on a miss.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use quire_model::{
    Entity, EntityCatalog, EntityFamily, EntityType, RegistryError, SchemaRegistry, TypedObject,
    WireCodec,
};
use quire_storage::{AttachmentStore, EntityRepository, StorageError};
use quire_types::RemoteId;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::FederationConfig;
use crate::error::{FederationError, FederationResult, FetchError};
use crate::fetcher::RemoteFetcher;
use crate::resolver::IdentityResolver;
use crate::tasks::{FederationTask, NoopDispatcher, TaskDispatcher};

type Flight = Arc<tokio::sync::Mutex<()>>;

/// The federation object layer: resolves identifiers to entities and maps
/// typed objects onto them.
///
/// Top-level resolutions and ingests of the same identifier are serialized.
/// Nested resolutions never wait on a flight, so a shared dependency may be
/// fetched twice; the losing create is turned back into a lookup.
pub struct Federation {
    config: FederationConfig,
    registry: Arc<SchemaRegistry>,
    catalog: Arc<EntityCatalog>,
    pub(crate) resolver: IdentityResolver,
    pub(crate) repository: Arc<dyn EntityRepository>,
    pub(crate) attachments: Arc<dyn AttachmentStore>,
    pub(crate) fetcher: Arc<dyn RemoteFetcher>,
    tasks: Arc<dyn TaskDispatcher>,
    in_flight: Mutex<HashMap<String, Flight>>,
}

impl Federation {
    /// Creates a federation layer over the built-in vocabulary.
    pub fn new(
        config: FederationConfig,
        repository: Arc<dyn EntityRepository>,
        attachments: Arc<dyn AttachmentStore>,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(SchemaRegistry::global().clone()),
            catalog: Arc::new(EntityCatalog::global().clone()),
            resolver: IdentityResolver::new(Arc::clone(&repository)),
            repository,
            attachments,
            fetcher,
            tasks: Arc::new(NoopDispatcher),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the wire schemas and entity catalog.
    #[must_use]
    pub fn with_vocabulary(mut self, registry: SchemaRegistry, catalog: EntityCatalog) -> Self {
        self.registry = Arc::new(registry);
        self.catalog = Arc::new(catalog);
        self
    }

    #[must_use]
    pub fn with_tasks(mut self, tasks: Arc<dyn TaskDispatcher>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn codec(&self) -> WireCodec<'_> {
        self.registry.codec()
    }

    /// The stored entity `identifier` refers to within `family`, if any.
    pub fn find_existing(&self, family: &EntityFamily, identifier: &str) -> FederationResult<Option<Entity>> {
        Ok(self.resolver.find_existing(family, identifier)?)
    }

    /// Looks up a family (or single entity type) by name.
    pub fn family(&self, name: &str) -> FederationResult<EntityFamily> {
        self.catalog
            .family(name)
            .ok_or_else(|| RegistryError::UnknownEntityType(name.to_string()).into())
    }

    pub(crate) fn entity_type(&self, name: &str) -> FederationResult<Arc<EntityType>> {
        self.catalog
            .entity_type(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownEntityType(name.to_string()).into())
    }

    /// Returns the entity for `identifier`, fetching and creating it when
    /// no member of `family` knows it yet.
    pub async fn resolve(&self, family: &EntityFamily, identifier: &str) -> FederationResult<Entity> {
        self.resolve_in(family, identifier, &[]).await
    }

    /// Decodes an inbound document and maps it onto the family member it
    /// already corresponds to, or onto a new entity.
    ///
    /// Ingests of the same identifier are serialized with resolutions of it.
    pub async fn ingest(&self, family: &EntityFamily, raw: &Value) -> FederationResult<Entity> {
        let object = self.codec().decode_document(raw)?;
        let flight = self.flight(object.id());
        let guard = Arc::clone(&flight).lock_owned().await;
        let result = self.ingest_object(family, &object).await;
        drop(guard);
        self.release(object.id(), flight);
        result
    }

    async fn ingest_object(&self, family: &EntityFamily, object: &TypedObject) -> FederationResult<Entity> {
        let chain = [object.id().to_string()];
        let existing = self.resolver.find_existing(family, object.id())?;
        let creating = existing.is_none();
        let entity_type = match &existing {
            Some(entity) => self.entity_type(&entity.entity_type)?,
            None => self.type_for(family, object)?,
        };
        match self.apply_in(object, &entity_type, existing, &chain).await {
            Err(FederationError::Storage(StorageError::Conflict(conflict))) if creating => {
                warn!("Lost creation race for {}, updating instead", conflict);
                let Some(winner) = self.resolver.find_existing(family, object.id())? else {
                    return Err(StorageError::Conflict(conflict).into());
                };
                let entity_type = self.entity_type(&winner.entity_type)?;
                self.apply_in(object, &entity_type, Some(winner), &chain).await
            }
            result => result,
        }
    }

    pub(crate) fn type_for(&self, family: &EntityFamily, object: &TypedObject) -> FederationResult<Arc<EntityType>> {
        self.catalog
            .type_for_object(family, object.object_type())
            .cloned()
            .ok_or_else(|| FederationError::UnsupportedTarget {
                entity_type: family.name.clone(),
                object_type: object.object_type().to_string(),
            })
    }

    /// `trail` holds the identifiers being resolved further up the chain;
    /// it may hold at most `max_depth` of them.
    pub(crate) fn resolve_in<'a>(
        &'a self,
        family: &'a EntityFamily,
        identifier: &'a str,
        trail: &'a [String],
    ) -> BoxFuture<'a, FederationResult<Entity>> {
        async move {
            if let Some(hit) = self.resolver.find_existing(family, identifier)? {
                return Ok(hit);
            }
            if trail.iter().any(|t| t == identifier) {
                return Err(FederationError::ReferenceCycle(identifier.to_string()));
            }
            if trail.len() > self.config.max_depth {
                return Err(FederationError::DepthExceeded {
                    identifier: identifier.to_string(),
                    max_depth: self.config.max_depth,
                });
            }
            if self.is_local(identifier) {
                return Err(FederationError::UnknownLocal(identifier.to_string()));
            }

            let flight = self.flight(identifier);
            // Nested resolutions never wait on another flight: two chains
            // crossing in opposite order would deadlock. The unique index
            // catches the resulting duplicate.
            let guard = if trail.is_empty() {
                Some(Arc::clone(&flight).lock_owned().await)
            } else {
                Arc::clone(&flight).try_lock_owned().ok()
            };
            let result = self.materialize(family, identifier, trail).await;
            drop(guard);
            self.release(identifier, flight);
            result
        }
        .boxed()
    }

    async fn materialize(
        &self,
        family: &EntityFamily,
        identifier: &str,
        trail: &[String],
    ) -> FederationResult<Entity> {
        if let Some(hit) = self.resolver.find_existing(family, identifier)? {
            debug!("{} was materialized while waiting", identifier);
            return Ok(hit);
        }

        let uri = RemoteId::parse(identifier).map_err(|e| FetchError::InvalidUri {
            uri: identifier.to_string(),
            reason: e.to_string(),
        })?;
        info!("Fetching remote object {}", identifier);
        let fetched = self.fetcher.fetch_document(uri.url()).await?;
        let object = self.codec().decode_document(&fetched.document)?;

        if object.id() != identifier {
            if let Some(hit) = self.resolver.find_existing(family, object.id())? {
                debug!("{} is known as {}", identifier, object.id());
                return Ok(hit);
            }
        }

        let entity_type = self.type_for(family, &object)?;
        let mut chain = trail.to_vec();
        chain.push(identifier.to_string());

        let entity = match self.apply_in(&object, &entity_type, None, &chain).await {
            Ok(entity) => entity,
            Err(FederationError::Storage(StorageError::Conflict(conflict))) => {
                warn!("Lost creation race for {}, re-resolving", conflict);
                match self.resolver.find_existing(family, object.id())? {
                    Some(winner) => winner,
                    None => return Err(StorageError::Conflict(conflict).into()),
                }
            }
            Err(e) => return Err(e),
        };

        self.schedule_refresh(&entity, &object);
        Ok(entity)
    }

    fn schedule_refresh(&self, entity: &Entity, object: &TypedObject) {
        let Some(host) = RemoteId::parse(object.id())
            .ok()
            .and_then(|id| id.host().map(str::to_string))
        else {
            return;
        };
        let task = FederationTask::RefreshRemoteServer {
            entity_id: entity.id,
            remote_id: object.id().to_string(),
            host,
        };
        if let Err(e) = self.tasks.dispatch(task) {
            warn!("Failed to schedule server refresh for {}: {}", entity.remote_id, e);
        }
    }

    fn is_local(&self, identifier: &str) -> bool {
        RemoteId::parse(identifier).is_ok_and(|id| id.is_on_domain(&self.config.local_domain))
    }

    fn flight(&self, identifier: &str) -> Flight {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(identifier.to_string()).or_default())
    }

    /// Drops the flight entry once no other resolution holds it.
    fn release(&self, identifier: &str, flight: Flight) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&flight) <= 2 {
            in_flight.remove(identifier);
        }
    }

    /// Number of identifiers currently being resolved.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
