use quire_types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A persisted record produced and maintained by the federation layer.
///
/// `data` is a JSON object keyed by entity column name. Relation columns
/// hold the linked entity's [`EntityId`]; attachment columns hold the key
/// returned by the attachment store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: String,
    /// Canonical identifier. Unique across the store.
    pub remote_id: String,
    /// Identifier the entity was first presented under, when it differs.
    pub origin_id: Option<String>,
    pub data: Value,
    pub created_at: i64,
    pub modified_at: i64,
}

impl Entity {
    /// Extract a string value from `data` using a JSON pointer (e.g., "/title").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.data.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Extract a boolean value from `data` using a JSON pointer.
    pub fn get_bool(&self, pointer: &str) -> Option<bool> {
        self.data.pointer(pointer).and_then(|v| v.as_bool())
    }

    /// Extract a numeric value from `data` using a JSON pointer.
    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.data.pointer(pointer).and_then(|v| v.as_f64())
    }

    /// Top-level column value, if set.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// Sets a top-level column, turning `data` into an object if needed.
    pub fn set_field(&mut self, name: &str, value: Value) {
        if !self.data.is_object() {
            self.data = Value::Object(Map::new());
        }
        if let Some(map) = self.data.as_object_mut() {
            map.insert(name.to_string(), value);
        }
    }

    /// The entity linked through relation column `name`.
    pub fn reference(&self, name: &str) -> Option<EntityId> {
        self.field(name)
            .and_then(Value::as_str)
            .and_then(|s| EntityId::parse(s).ok())
    }

    /// Whether `identifier` is this entity's canonical or origin id.
    pub fn is_addressed_by(&self, identifier: &str) -> bool {
        self.remote_id == identifier || self.origin_id.as_deref() == Some(identifier)
    }
}

/// Field values for an entity about to be created.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewEntity {
    /// Identifier the entity is presented under; `None` mints a local one.
    pub remote_id: Option<String>,
    pub data: Value,
}

impl NewEntity {
    pub fn new(remote_id: impl Into<String>, data: Value) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            data,
        }
    }

    /// A locally originated entity; the store mints its canonical id.
    pub fn local(data: Value) -> Self {
        Self {
            remote_id: None,
            data,
        }
    }
}
