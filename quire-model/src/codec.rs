//! Conversion between raw wire documents and [`TypedObject`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{CodecResult, SchemaValidationError};
use crate::object::{Attachment, FieldValue, TypedObject};
use crate::registry::SchemaRegistry;
use crate::schema::{FieldKind, FieldSpec, ObjectSchema, Presence};
use crate::{ID_FIELD, TYPE_FIELD};

/// Decodes documents against the schemas of one registry.
///
/// The registry is needed for embedded sub-documents, which are decoded
/// against the schema named by their own `type`.
#[derive(Debug, Clone, Copy)]
pub struct WireCodec<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> WireCodec<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Decodes a document, picking the schema from its `type`.
    pub fn decode_document(&self, raw: &Value) -> CodecResult<TypedObject> {
        let doc = raw.as_object().ok_or_else(|| SchemaValidationError::NotAnObject {
            schema: crate::vocab::OBJECT.into(),
        })?;
        let object_type = match doc.get(TYPE_FIELD) {
            Some(Value::String(t)) if !t.is_empty() => t,
            Some(Value::Null) | None => {
                return Err(SchemaValidationError::MissingField {
                    schema: crate::vocab::OBJECT.into(),
                    field: TYPE_FIELD.into(),
                });
            }
            Some(_) => {
                return Err(SchemaValidationError::EmptyIdentity {
                    schema: crate::vocab::OBJECT.into(),
                    field: TYPE_FIELD,
                });
            }
        };
        let schema = self
            .registry
            .get(object_type)
            .ok_or_else(|| SchemaValidationError::UnknownType(object_type.clone()))?;
        self.decode(raw, schema)
    }

    /// Decodes a document against the schema registered as `schema_name`.
    pub fn decode_as(&self, raw: &Value, schema_name: &str) -> CodecResult<TypedObject> {
        let schema = self
            .registry
            .get(schema_name)
            .ok_or_else(|| SchemaValidationError::UnknownType(schema_name.into()))?;
        self.decode(raw, schema)
    }

    /// Decodes a document against `schema`.
    ///
    /// Undeclared keys are dropped. Absent (or null) fields fall back to
    /// their declared default; fixed fields ignore the input entirely.
    pub fn decode(&self, raw: &Value, schema: &Arc<ObjectSchema>) -> CodecResult<TypedObject> {
        let doc = raw.as_object().ok_or_else(|| SchemaValidationError::NotAnObject {
            schema: schema.name.clone(),
        })?;

        let mut fields = BTreeMap::new();
        for spec in &schema.fields {
            let supplied = doc.get(&spec.name).filter(|v| !v.is_null());
            let value = match (&spec.presence, supplied) {
                (Presence::Fixed(literal), _) => literal,
                (_, Some(value)) => value,
                (Presence::Default(fallback), None) => fallback,
                (Presence::Optional, None) => continue,
                (Presence::Required, None) => {
                    return Err(SchemaValidationError::MissingField {
                        schema: schema.name.clone(),
                        field: spec.name.clone(),
                    });
                }
            };
            let decoded = self.decode_field(schema, spec, value)?;
            fields.insert(spec.name.clone(), decoded);
        }

        for key in [ID_FIELD, TYPE_FIELD] {
            match fields.get(key) {
                Some(FieldValue::Value(Value::String(s))) if !s.is_empty() => {}
                Some(_) => {
                    return Err(SchemaValidationError::EmptyIdentity {
                        schema: schema.name.clone(),
                        field: key,
                    });
                }
                None => {
                    return Err(SchemaValidationError::MissingField {
                        schema: schema.name.clone(),
                        field: key.into(),
                    });
                }
            }
        }

        Ok(TypedObject::from_parts(Arc::clone(schema), fields))
    }

    fn decode_field(
        &self,
        schema: &ObjectSchema,
        spec: &FieldSpec,
        value: &Value,
    ) -> CodecResult<FieldValue> {
        let invalid = || SchemaValidationError::InvalidValue {
            schema: schema.name.clone(),
            field: spec.name.clone(),
            expected: spec.kind.expected(),
        };

        let decoded = match &spec.kind {
            FieldKind::Text if value.is_string() => FieldValue::Value(value.clone()),
            FieldKind::Boolean if value.is_boolean() => FieldValue::Value(value.clone()),
            FieldKind::Integer if value.is_i64() || value.is_u64() => {
                FieldValue::Value(value.clone())
            }
            FieldKind::Number if value.is_number() => FieldValue::Value(value.clone()),
            FieldKind::DateTime => {
                let s = value.as_str().ok_or_else(invalid)?;
                chrono::DateTime::parse_from_rfc3339(s).map_err(|_| invalid())?;
                FieldValue::Value(value.clone())
            }
            FieldKind::TextList => match value {
                Value::String(_) => FieldValue::Value(Value::Array(vec![value.clone()])),
                Value::Array(items) if items.iter().all(Value::is_string) => {
                    FieldValue::Value(value.clone())
                }
                _ => return Err(invalid()),
            },
            FieldKind::Json => FieldValue::Value(value.clone()),
            FieldKind::Reference { schema_hint } => match value {
                Value::String(id) if !id.is_empty() => FieldValue::Reference(id.clone()),
                Value::Object(doc) => {
                    let nested = self.embedded_schema(doc, schema_hint.as_deref())?;
                    FieldValue::Object(Box::new(self.decode(value, nested)?))
                }
                _ => return Err(invalid()),
            },
            FieldKind::Attachment => match value {
                Value::String(url) if !url.is_empty() => FieldValue::Attachment(Attachment::new(url.clone())),
                Value::Object(doc) => {
                    let url = doc
                        .get("url")
                        .and_then(Value::as_str)
                        .filter(|u| !u.is_empty())
                        .ok_or_else(invalid)?;
                    FieldValue::Attachment(Attachment {
                        url: url.to_string(),
                        media_type: string_key(doc, "mediaType"),
                        name: string_key(doc, "name"),
                    })
                }
                _ => return Err(invalid()),
            },
            _ => return Err(invalid()),
        };
        Ok(decoded)
    }

    fn embedded_schema(
        &self,
        doc: &Map<String, Value>,
        schema_hint: Option<&str>,
    ) -> CodecResult<&'r Arc<ObjectSchema>> {
        let declared = doc.get(TYPE_FIELD).and_then(Value::as_str);
        let registry = self.registry;
        if let Some(schema) = declared.and_then(|t| registry.get(t)) {
            return Ok(schema);
        }
        match schema_hint.and_then(|h| registry.get(h)) {
            Some(schema) => Ok(schema),
            None => Err(SchemaValidationError::UnknownType(
                declared.or(schema_hint).unwrap_or_default().to_string(),
            )),
        }
    }
}

/// Encodes a typed object as a flat wire document.
///
/// Every field declared by the object's schema is present; unset optional
/// fields are written as `null`.
pub fn encode(object: &TypedObject) -> Value {
    let mut map = Map::new();
    for spec in &object.schema().fields {
        let value = object
            .get(&spec.name)
            .map(FieldValue::to_json)
            .unwrap_or(Value::Null);
        map.insert(spec.name.clone(), value);
    }
    Value::Object(map)
}

fn string_key(doc: &Map<String, Value>, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(str::to_string)
}
