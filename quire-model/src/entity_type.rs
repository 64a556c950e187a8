use serde::{Deserialize, Serialize};

/// Describes a persisted entity type and how typed objects map onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    /// Typed-object variants that may be mapped onto this type.
    pub activity_types: Vec<String>,
    pub fields: Vec<EntityField>,
    /// Path segment for canonical ids of locally minted rows
    /// (`https://{domain}/{local_path}/{id}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    /// Catalog entries keep the id they were presented under as `origin_id`
    /// and receive a local canonical `remote_id`.
    #[serde(default)]
    pub tracks_origin: bool,
}

impl EntityType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            activity_types: Vec::new(),
            fields: Vec::new(),
            local_path: None,
            tracks_origin: false,
        }
    }

    /// Accepts typed objects of `activity_type`.
    #[must_use]
    pub fn accepts(mut self, activity_type: &str) -> Self {
        self.activity_types.push(activity_type.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: EntityField) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = EntityField>) -> Self {
        self.fields.extend(fields);
        self
    }

    #[must_use]
    pub fn hosted_at(mut self, path: &str) -> Self {
        self.local_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn tracking_origin(mut self) -> Self {
        self.tracks_origin = true;
        self
    }

    /// Whether objects of `activity_type` map onto this type.
    pub fn maps(&self, activity_type: &str) -> bool {
        self.activity_types.iter().any(|t| t == activity_type)
    }
}

/// A column of an [`EntityType`] and the wire field it is filled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityField {
    pub name: String,
    pub activity_field: String,
    pub kind: EntityFieldKind,
}

impl EntityField {
    fn simple(name: &str, activity_field: &str, kind: EntityFieldKind) -> Self {
        Self {
            name: name.into(),
            activity_field: activity_field.into(),
            kind,
        }
    }

    /// Shorthand for a directly assigned value.
    pub fn scalar(name: &str, activity_field: &str) -> Self {
        Self::simple(name, activity_field, EntityFieldKind::Scalar)
    }

    /// Shorthand for a dedicated related row of type `target`.
    pub fn one_to_one(name: &str, activity_field: &str, target: &str) -> Self {
        Self::simple(
            name,
            activity_field,
            EntityFieldKind::OneToOne {
                target: target.into(),
            },
        )
    }

    /// Shorthand for a link to any member of `family`.
    pub fn foreign_key(name: &str, activity_field: &str, family: &str) -> Self {
        Self::simple(
            name,
            activity_field,
            EntityFieldKind::ForeignKey {
                family: family.into(),
            },
        )
    }

    /// Shorthand for a fetched-and-stored binary.
    pub fn attachment(name: &str, activity_field: &str) -> Self {
        Self::simple(name, activity_field, EntityFieldKind::Attachment)
    }
}

/// How a column is filled during mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EntityFieldKind {
    Scalar,
    OneToOne { target: String },
    ForeignKey { family: String },
    Attachment,
}

/// A base entity type plus its subtypes, sharing one identifier namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFamily {
    pub name: String,
    pub base: String,
    #[serde(default)]
    pub subtypes: Vec<String>,
}

impl EntityFamily {
    pub fn new(name: &str, base: &str, subtypes: &[&str]) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            subtypes: subtypes.iter().map(|s| (*s).into()).collect(),
        }
    }

    /// A family with no subtypes, named after its only member.
    pub fn single(entity_type: &str) -> Self {
        Self::new(entity_type, entity_type, &[])
    }

    /// Member type names in search order: base first, then subtypes.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.base.as_str()).chain(self.subtypes.iter().map(String::as_str))
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.members().any(|m| m == entity_type)
    }
}
