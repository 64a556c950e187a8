use pretty_assertions::assert_eq;
use quire_model::vocab::{self, entities};
use quire_model::{
    EntityCatalog, EntityFamily, EntityField, EntityFieldKind, EntityType, FieldKind, FieldSpec,
    ObjectSchema, Presence, RegistryError, SchemaRegistry,
};
use serde_json::json;

// ── FieldSpec constructors ───────────────────────────────────────

#[test]
fn field_specs_default_to_required() {
    let f = FieldSpec::text("title");
    assert_eq!(f.name, "title");
    assert_eq!(f.kind, FieldKind::Text);
    assert!(f.is_required());
}

#[test]
fn field_spec_presence_modifiers() {
    assert_eq!(FieldSpec::text("a").optional().presence, Presence::Optional);
    assert_eq!(
        FieldSpec::boolean("b").or_default(false).presence,
        Presence::Default(json!(false))
    );
    assert_eq!(
        FieldSpec::text("type").fixed("Thing").presence,
        Presence::Fixed(json!("Thing"))
    );
}

#[test]
fn reference_field_carries_hint() {
    let f = FieldSpec::reference("publicKey", Some("PublicKey"));
    assert_eq!(
        f.kind,
        FieldKind::Reference {
            schema_hint: Some("PublicKey".into())
        }
    );
}

#[test]
fn field_spec_serde_shape() {
    let f = FieldSpec::boolean("sensitive").or_default(false);
    let json = serde_json::to_value(&f).unwrap();
    assert_eq!(
        json,
        json!({
            "name": "sensitive",
            "kind": {"kind": "boolean"},
            "presence": {"presence": "default", "value": false}
        })
    );
}

// ── Registry ─────────────────────────────────────────────────────

#[test]
fn new_registry_has_base_object() {
    let registry = SchemaRegistry::new();
    let base = registry.get(vocab::OBJECT).unwrap();
    let names: Vec<&str> = base.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "type"]);
    assert!(base.parent.is_none());
}

#[test]
fn register_flattens_parent_fields() {
    let mut registry = SchemaRegistry::new();
    registry
        .register(ObjectSchema::new("Thing").field(FieldSpec::text("name")))
        .unwrap();
    let child = registry
        .register(ObjectSchema::extending("Gadget", "Thing").field(FieldSpec::integer("size")))
        .unwrap();
    let names: Vec<&str> = child.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "type", "name", "size"]);
    assert_eq!(child.lineage, vec!["Thing".to_string(), "Object".to_string()]);
}

#[test]
fn child_field_overrides_parent_in_place() {
    let mut registry = SchemaRegistry::new();
    let schema = registry
        .register(ObjectSchema::new("TestObject").fixed_type())
        .unwrap();
    assert_eq!(schema.fields.len(), 2);
    assert_eq!(schema.fields[1].name, "type");
    assert_eq!(schema.fields[1].presence, Presence::Fixed(json!("TestObject")));
}

#[test]
fn register_unknown_parent_fails() {
    let mut registry = SchemaRegistry::new();
    let err = registry
        .register(ObjectSchema::extending("Orphan", "Nobody"))
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::UnknownParent {
            schema: "Orphan".into(),
            parent: "Nobody".into()
        }
    );
}

#[test]
fn register_duplicate_fails() {
    let mut registry = SchemaRegistry::new();
    registry.register(ObjectSchema::new("Thing")).unwrap();
    let err = registry.register(ObjectSchema::new("Thing")).unwrap_err();
    assert_eq!(err, RegistryError::DuplicateSchema("Thing".into()));
}

#[test]
fn builtin_registry_contains_vocabulary() {
    let registry = SchemaRegistry::global();
    for name in [
        vocab::OBJECT,
        vocab::PERSON,
        vocab::PUBLIC_KEY,
        vocab::BOOK,
        vocab::EDITION,
        vocab::WORK,
        vocab::NOTE,
        vocab::COMMENT,
        vocab::QUOTATION,
        vocab::REVIEW,
    ] {
        assert!(registry.contains(name), "missing {name}");
    }
    assert_eq!(
        registry.get(vocab::QUOTATION).unwrap().lineage,
        [vocab::COMMENT, vocab::NOTE, vocab::OBJECT].map(String::from).to_vec()
    );
    assert!(registry.get(vocab::EDITION).unwrap().get("title").is_some());
}

#[test]
fn registry_names_sorted() {
    let registry = SchemaRegistry::builtin();
    let names = registry.names();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

// ── EntityType / EntityField ─────────────────────────────────────

#[test]
fn entity_field_shorthands() {
    assert_eq!(EntityField::scalar("name", "name").kind, EntityFieldKind::Scalar);
    assert_eq!(
        EntityField::one_to_one("key_pair", "publicKey", "key_pair").kind,
        EntityFieldKind::OneToOne { target: "key_pair".into() }
    );
    assert_eq!(
        EntityField::foreign_key("user", "attributedTo", "user").kind,
        EntityFieldKind::ForeignKey { family: "user".into() }
    );
    assert_eq!(EntityField::attachment("avatar", "icon").kind, EntityFieldKind::Attachment);
}

#[test]
fn entity_type_builder() {
    let t = EntityType::new("gadget")
        .accepts("Gadget")
        .hosted_at("gadget")
        .tracking_origin()
        .with_field(EntityField::scalar("size", "size"));
    assert!(t.maps("Gadget"));
    assert!(!t.maps("Object"));
    assert_eq!(t.local_path.as_deref(), Some("gadget"));
    assert!(t.tracks_origin);
    assert_eq!(t.fields[0].activity_field, "size");
}

#[test]
fn entity_type_serde_roundtrip() {
    let t = EntityType::new("user")
        .accepts("Person")
        .with_field(EntityField::one_to_one("key_pair", "publicKey", "key_pair"));
    let json = serde_json::to_string(&t).unwrap();
    let back: EntityType = serde_json::from_str(&json).unwrap();
    assert_eq!(back, t);
}

// ── Families & catalog ───────────────────────────────────────────

#[test]
fn family_members_base_first() {
    let family = EntityFamily::new("status", "status", &["comment", "review"]);
    let members: Vec<&str> = family.members().collect();
    assert_eq!(members, vec!["status", "comment", "review"]);
    assert!(family.contains("review"));
    assert!(!family.contains("user"));
}

#[test]
fn catalog_single_member_family_fallback() {
    let catalog = EntityCatalog::global();
    let family = catalog.family(entities::USER).unwrap();
    assert_eq!(family, EntityFamily::single(entities::USER));
    assert!(catalog.family("nonexistent").is_none());
}

#[test]
fn catalog_type_for_object_searches_family() {
    let catalog = EntityCatalog::global();
    let books = catalog.family(entities::BOOK).unwrap();
    assert_eq!(
        catalog.type_for_object(&books, vocab::WORK).unwrap().name,
        entities::WORK
    );
    assert!(catalog.type_for_object(&books, vocab::BOOK).is_none());
    let statuses = catalog.family(entities::STATUS).unwrap();
    assert_eq!(
        catalog.type_for_object(&statuses, vocab::REVIEW).unwrap().name,
        entities::REVIEW
    );
}

#[test]
fn catalog_rejects_family_with_unknown_member() {
    let mut catalog = EntityCatalog::new();
    catalog.register_type(EntityType::new("a")).unwrap();
    let err = catalog
        .register_family(EntityFamily::new("a", "a", &["ghost"]))
        .unwrap_err();
    assert_eq!(err, RegistryError::UnknownEntityType("ghost".into()));
}

#[test]
fn catalog_rejects_duplicate_type() {
    let mut catalog = EntityCatalog::new();
    catalog.register_type(EntityType::new("a")).unwrap();
    assert_eq!(
        catalog.register_type(EntityType::new("a")).unwrap_err(),
        RegistryError::DuplicateEntityType("a".into())
    );
}

#[test]
fn builtin_entity_types_map_their_objects() {
    let catalog = EntityCatalog::global();
    let user = catalog.entity_type(entities::USER).unwrap();
    assert!(user.maps(vocab::PERSON));
    assert!(!user.maps(vocab::OBJECT));
    assert!(catalog.entity_type(entities::EDITION).unwrap().tracks_origin);
    assert!(catalog.entity_type(entities::BOOK).unwrap().activity_types.is_empty());
}
