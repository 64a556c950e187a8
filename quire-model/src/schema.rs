use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared shape of one wire object type.
///
/// `fields` holds the schema's own declarations until it is registered;
/// the registry replaces them with the effective list, parent fields first,
/// with same-named child fields substituted in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub fields: Vec<FieldSpec>,
    /// Ancestor names, nearest first. Filled in by the registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lineage: Vec<String>,
}

impl ObjectSchema {
    /// A schema extending the base `Object` schema.
    pub fn new(name: &str) -> Self {
        Self::extending(name, crate::vocab::OBJECT)
    }

    /// A schema extending `parent`.
    pub fn extending(name: &str, parent: &str) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
            fields: Vec::new(),
            lineage: Vec::new(),
        }
    }

    /// A schema with no parent. Only the base `Object` schema is built this way.
    pub fn root(name: &str) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            lineage: Vec::new(),
        }
    }

    /// Adds a field declaration.
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Forces the discriminator to this schema's own name.
    #[must_use]
    pub fn fixed_type(self) -> Self {
        let name = self.name.clone();
        self.field(FieldSpec::text(crate::TYPE_FIELD).fixed(Value::String(name)))
    }

    /// Looks up a field declaration by wire name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One declared field of an [`ObjectSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Wire key.
    pub name: String,
    pub kind: FieldKind,
    pub presence: Presence,
}

impl FieldSpec {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            presence: Presence::Required,
        }
    }

    /// A string field.
    pub fn text(name: &str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// A boolean field.
    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// An integer field.
    pub fn integer(name: &str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// A numeric field (integer or float).
    pub fn number(name: &str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    /// An RFC 3339 timestamp field.
    pub fn datetime(name: &str) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    /// A list of strings. A lone string is accepted as a one-element list.
    pub fn text_list(name: &str) -> Self {
        Self::new(name, FieldKind::TextList)
    }

    /// An opaque JSON value.
    pub fn json(name: &str) -> Self {
        Self::new(name, FieldKind::Json)
    }

    /// A link to another object: a bare identifier or an embedded document.
    ///
    /// `schema_hint` names the schema an embedded document is decoded
    /// against when it carries no `type` of its own.
    pub fn reference(name: &str, schema_hint: Option<&str>) -> Self {
        Self::new(
            name,
            FieldKind::Reference {
                schema_hint: schema_hint.map(Into::into),
            },
        )
    }

    /// An externally hosted binary (image) referenced by URL.
    pub fn attachment(name: &str) -> Self {
        Self::new(name, FieldKind::Attachment)
    }

    /// Marks the field optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Supplies a fallback used when the field is absent.
    #[must_use]
    pub fn or_default(mut self, value: impl Into<Value>) -> Self {
        self.presence = Presence::Default(value.into());
        self
    }

    /// Pins the field to a literal; input values are ignored.
    #[must_use]
    pub fn fixed(mut self, value: impl Into<Value>) -> Self {
        self.presence = Presence::Fixed(value.into());
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self.presence, Presence::Required)
    }
}

/// The value shape a field accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldKind {
    Text,
    Boolean,
    Integer,
    Number,
    DateTime,
    TextList,
    Json,
    Reference {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_hint: Option<String>,
    },
    Attachment,
}

impl FieldKind {
    /// Human-readable description used in validation errors.
    pub(crate) fn expected(&self) -> &'static str {
        match self {
            Self::Text => "a string",
            Self::Boolean => "a boolean",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::DateTime => "an RFC 3339 timestamp",
            Self::TextList => "a string or list of strings",
            Self::Json => "any JSON value",
            Self::Reference { .. } => "an identifier or embedded object",
            Self::Attachment => "a URL or object with a `url`",
        }
    }
}

/// What the codec does when a field is absent from the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "presence", content = "value")]
pub enum Presence {
    /// Decoding fails.
    Required,
    /// The field is left unset.
    Optional,
    /// The declared value is used.
    Default(Value),
    /// The declared value is always used, even when input supplies one.
    Fixed(Value),
}
