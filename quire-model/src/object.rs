use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::ObjectSchema;

/// A validated in-memory form of an inbound document.
///
/// Built only by [`crate::WireCodec`], so `id` and `type` are always
/// non-empty and every field conforms to the schema. There are no setters:
/// to change a value, encode, edit the document and decode again.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedObject {
    schema: Arc<ObjectSchema>,
    fields: BTreeMap<String, FieldValue>,
}

impl TypedObject {
    pub(crate) fn from_parts(schema: Arc<ObjectSchema>, fields: BTreeMap<String, FieldValue>) -> Self {
        Self { schema, fields }
    }

    pub fn id(&self) -> &str {
        self.get_str(crate::ID_FIELD).unwrap_or_default()
    }

    /// The discriminator value.
    pub fn object_type(&self) -> &str {
        self.get_str(crate::TYPE_FIELD).unwrap_or_default()
    }

    pub fn schema(&self) -> &Arc<ObjectSchema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Value(Value::String(s))) => Some(s),
            Some(FieldValue::Reference(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.fields.get(name) {
            Some(FieldValue::Value(v)) => v.as_bool(),
            _ => None,
        }
    }

    /// Names of the fields that hold a value.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The decoded value of one declared field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Scalar or opaque JSON.
    Value(Value),
    /// A relation given as a bare identifier.
    Reference(String),
    /// A relation given as an embedded document.
    Object(Box<TypedObject>),
    /// An externally hosted binary.
    Attachment(Attachment),
}

impl FieldValue {
    /// Wire form of the value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Reference(id) => Value::String(id.clone()),
            Self::Object(object) => crate::encode(object),
            Self::Attachment(attachment) => attachment.to_json(),
        }
    }

    /// The identifier a relation points at, bare or embedded.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Reference(id) => Some(id),
            Self::Object(object) => Some(object.id()),
            _ => None,
        }
    }
}

/// Reference to a binary resource hosted by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attachment {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            media_type: None,
            name: None,
        }
    }

    /// Wire form: an ActivityStreams `Image`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::String("Image".into()));
        map.insert("url".into(), Value::String(self.url.clone()));
        if let Some(media_type) = &self.media_type {
            map.insert("mediaType".into(), Value::String(media_type.clone()));
        }
        if let Some(name) = &self.name {
            map.insert("name".into(), Value::String(name.clone()));
        }
        Value::Object(map)
    }
}
