//! Process-wide catalogs: wire schemas by discriminator, entity types by name.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::codec::WireCodec;
use crate::entity_type::{EntityFamily, EntityType};
use crate::error::RegistryError;
use crate::schema::{FieldSpec, ObjectSchema};
use crate::{ID_FIELD, TYPE_FIELD, vocab};

/// Maps each `type` discriminator to its effective [`ObjectSchema`].
///
/// Schemas are flattened on registration, so lookups never walk the
/// inheritance chain.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<ObjectSchema>>,
}

impl SchemaRegistry {
    /// A registry holding only the base `Object` schema.
    pub fn new() -> Self {
        let base = ObjectSchema::root(vocab::OBJECT)
            .field(FieldSpec::text(ID_FIELD))
            .field(FieldSpec::text(TYPE_FIELD));
        let mut schemas = HashMap::new();
        schemas.insert(base.name.clone(), Arc::new(base));
        Self { schemas }
    }

    /// A registry preloaded with the built-in vocabulary.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for schema in vocab::object_schemas() {
            let registered = registry.register(schema);
            debug_assert!(registered.is_ok(), "built-in schema rejected: {registered:?}");
        }
        registry
    }

    /// The shared built-in registry, created on first use.
    pub fn global() -> &'static SchemaRegistry {
        static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::builtin)
    }

    /// Registers a schema. Its parent must already be registered.
    pub fn register(&mut self, schema: ObjectSchema) -> Result<Arc<ObjectSchema>, RegistryError> {
        if self.schemas.contains_key(&schema.name) {
            return Err(RegistryError::DuplicateSchema(schema.name));
        }
        let resolved = match &schema.parent {
            Some(parent_name) => {
                let parent = self.schemas.get(parent_name).ok_or_else(|| {
                    RegistryError::UnknownParent {
                        schema: schema.name.clone(),
                        parent: parent_name.clone(),
                    }
                })?;
                let mut fields = parent.fields.clone();
                for own in schema.fields {
                    match fields.iter_mut().find(|f| f.name == own.name) {
                        Some(slot) => *slot = own,
                        None => fields.push(own),
                    }
                }
                let mut lineage = vec![parent.name.clone()];
                lineage.extend(parent.lineage.iter().cloned());
                ObjectSchema {
                    name: schema.name,
                    parent: schema.parent,
                    fields,
                    lineage,
                }
            }
            None => schema,
        };
        let resolved = Arc::new(resolved);
        self.schemas.insert(resolved.name.clone(), Arc::clone(&resolved));
        Ok(resolved)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ObjectSchema>> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered discriminators, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn codec(&self) -> WireCodec<'_> {
        WireCodec::new(self)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted entity types and the families identifiers are searched across.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    types: HashMap<String, Arc<EntityType>>,
    families: HashMap<String, EntityFamily>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog preloaded with the built-in entity types and families.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for entity_type in vocab::entity_types() {
            let registered = catalog.register_type(entity_type);
            debug_assert!(registered.is_ok(), "built-in entity type rejected: {registered:?}");
        }
        for family in vocab::families() {
            let registered = catalog.register_family(family);
            debug_assert!(registered.is_ok(), "built-in family rejected: {registered:?}");
        }
        catalog
    }

    /// The shared built-in catalog, created on first use.
    pub fn global() -> &'static EntityCatalog {
        static GLOBAL: OnceLock<EntityCatalog> = OnceLock::new();
        GLOBAL.get_or_init(Self::builtin)
    }

    pub fn register_type(&mut self, entity_type: EntityType) -> Result<(), RegistryError> {
        if self.types.contains_key(&entity_type.name) {
            return Err(RegistryError::DuplicateEntityType(entity_type.name));
        }
        self.types
            .insert(entity_type.name.clone(), Arc::new(entity_type));
        Ok(())
    }

    /// Registers a family. Every member must already be a registered type.
    pub fn register_family(&mut self, family: EntityFamily) -> Result<(), RegistryError> {
        if self.families.contains_key(&family.name) {
            return Err(RegistryError::DuplicateFamily(family.name));
        }
        if let Some(unknown) = family.members().find(|m| !self.types.contains_key(*m)) {
            return Err(RegistryError::UnknownEntityType(unknown.to_string()));
        }
        self.families.insert(family.name.clone(), family);
        Ok(())
    }

    pub fn entity_type(&self, name: &str) -> Option<&Arc<EntityType>> {
        self.types.get(name)
    }

    /// A registered family, or the single-member family of a registered type.
    pub fn family(&self, name: &str) -> Option<EntityFamily> {
        self.families
            .get(name)
            .cloned()
            .or_else(|| self.types.contains_key(name).then(|| EntityFamily::single(name)))
    }

    /// First member of `family` that accepts `object_type`.
    pub fn type_for_object(
        &self,
        family: &EntityFamily,
        object_type: &str,
    ) -> Option<&Arc<EntityType>> {
        family
            .members()
            .filter_map(|m| self.types.get(m))
            .find(|t| t.maps(object_type))
    }
}
