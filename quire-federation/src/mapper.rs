//! Projection of typed objects onto persisted entities.

use futures::FutureExt;
use futures::future::BoxFuture;
use quire_model::{
    Attachment, Entity, EntityFamily, EntityField, EntityFieldKind, EntityType, FieldValue,
    NewEntity, TypedObject,
};
use quire_storage::StoredAttachment;
use quire_types::{EntityId, RemoteId};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{FederationError, FederationResult, FetchError};
use crate::orchestrator::Federation;

impl Federation {
    /// Maps `object` onto `existing`, or onto a new entity of `entity_type`.
    ///
    /// Scalars overwrite the stored value. Relations are resolved (bare
    /// identifiers) or mapped in place (embedded objects). Attachments are
    /// fetched after the entity is persisted; a failed attachment is
    /// logged and leaves only that column untouched.
    ///
    /// Related entities are persisted before `object` itself. They stay in
    /// place if the final create or save fails, and a retry links them again.
    pub async fn apply(
        &self,
        object: &TypedObject,
        entity_type: &EntityType,
        existing: Option<Entity>,
    ) -> FederationResult<Entity> {
        self.apply_in(object, entity_type, existing, &[]).await
    }

    /// Decodes a full document against its declared schema and maps it.
    pub async fn map_document(
        &self,
        raw: &Value,
        entity_type: &EntityType,
        existing: Option<Entity>,
    ) -> FederationResult<Entity> {
        let object = self.codec().decode_document(raw)?;
        self.apply(&object, entity_type, existing).await
    }

    pub(crate) fn apply_in<'a>(
        &'a self,
        object: &'a TypedObject,
        entity_type: &'a EntityType,
        existing: Option<Entity>,
        trail: &'a [String],
    ) -> BoxFuture<'a, FederationResult<Entity>> {
        async move {
            if !entity_type.maps(object.object_type()) {
                return Err(FederationError::UnsupportedTarget {
                    entity_type: entity_type.name.clone(),
                    object_type: object.object_type().to_string(),
                });
            }
            if existing.is_none() && RemoteId::parse(object.id()).is_err() {
                return Err(FederationError::IdentityRequired {
                    entity_type: entity_type.name.clone(),
                    identifier: object.id().to_string(),
                });
            }

            let mut data = match existing.as_ref().map(|e| &e.data) {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            };

            for field in &entity_type.fields {
                let Some(value) = object.get(&field.activity_field) else {
                    continue;
                };
                match &field.kind {
                    EntityFieldKind::Scalar => {
                        data.insert(field.name.clone(), value.to_json());
                    }
                    EntityFieldKind::OneToOne { target: family }
                    | EntityFieldKind::ForeignKey { family } => {
                        let family = self.family(family)?;
                        let linked = existing.as_ref().and_then(|e| e.reference(&field.name));
                        if let Some(id) = self.map_relation(value, &family, linked, trail).await? {
                            data.insert(field.name.clone(), Value::String(id.to_string()));
                        }
                    }
                    EntityFieldKind::Attachment => {}
                }
            }

            let mut entity = match existing {
                Some(mut entity) => {
                    entity.data = Value::Object(data);
                    self.repository.save(&mut entity)?;
                    debug!("Updated {} {}", entity.entity_type, entity.id);
                    entity
                }
                None => {
                    let entity = self
                        .repository
                        .create(entity_type, NewEntity::new(object.id(), Value::Object(data)))?;
                    info!("Created {} {} from {}", entity.entity_type, entity.id, object.id());
                    entity
                }
            };

            let mut changed = false;
            for field in entity_type.fields.iter().filter(|f| f.kind == EntityFieldKind::Attachment) {
                let Some(FieldValue::Attachment(attachment)) = object.get(&field.activity_field) else {
                    continue;
                };
                match self.store_attachment(&entity, field, attachment).await {
                    Ok(stored) => {
                        entity.set_field(&field.name, Value::String(stored.key));
                        changed = true;
                    }
                    Err(e) => {
                        warn!(
                            "Skipping {} of {} ({}): {}",
                            field.name, entity.remote_id, attachment.url, e
                        );
                    }
                }
            }
            if changed {
                self.repository.save(&mut entity)?;
            }

            Ok(entity)
        }
        .boxed()
    }

    /// Links one relation value, returning the related entity's id.
    async fn map_relation(
        &self,
        value: &FieldValue,
        family: &EntityFamily,
        linked: Option<EntityId>,
        trail: &[String],
    ) -> FederationResult<Option<EntityId>> {
        match value {
            FieldValue::Reference(identifier) | FieldValue::Value(Value::String(identifier)) => {
                let related = self.resolve_in(family, identifier, trail).await?;
                Ok(Some(related.id))
            }
            FieldValue::Object(embedded) => {
                let current = match linked {
                    Some(id) => self
                        .repository
                        .get(&id)?
                        .filter(|e| family.contains(&e.entity_type)),
                    None => None,
                };
                let current = match current {
                    Some(entity) => Some(entity),
                    None => self.resolver.find_existing(family, embedded.id())?,
                };
                let target = match &current {
                    Some(entity) => self.entity_type(&entity.entity_type)?,
                    None => self.type_for(family, embedded)?,
                };
                let related = self.apply_in(embedded, &target, current, trail).await?;
                Ok(Some(related.id))
            }
            other => {
                debug!("Ignoring non-reference value {:?} for {}", other, family.name);
                Ok(None)
            }
        }
    }

    async fn store_attachment(
        &self,
        entity: &Entity,
        field: &EntityField,
        attachment: &Attachment,
    ) -> FederationResult<StoredAttachment> {
        let uri = RemoteId::parse(&attachment.url).map_err(|e| FetchError::InvalidUri {
            uri: attachment.url.clone(),
            reason: e.to_string(),
        })?;
        let fetched = self.fetcher.fetch_attachment(uri.url()).await?;
        let hint = fetched
            .content_type
            .as_deref()
            .or(attachment.media_type.as_deref());
        let stored = self
            .attachments
            .store(entity, &field.name, &fetched.bytes, hint)?;
        debug!("Stored {} for {} as {}", field.name, entity.id, stored.key);
        Ok(stored)
    }
}
