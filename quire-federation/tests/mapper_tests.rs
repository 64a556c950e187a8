mod common;

use std::time::Duration;

use common::*;
use pretty_assertions::assert_eq;
use quire_federation::FederationError;
use quire_model::vocab::entities;
use quire_model::{NewEntity, SchemaValidationError};
use quire_storage::{EntityRepository, Lookup};
use serde_json::json;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

// ── Target checks ───────────────────────────────────────────────

#[tokio::test]
async fn unsupported_target_is_rejected() {
    let h = harness().await;
    let object = registry()
        .codec()
        .decode_document(&person("https://example.com", "mouse"))
        .unwrap();

    let err = h
        .federation
        .apply(&object, &entity_type(entities::STATUS), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FederationError::UnsupportedTarget { ref entity_type, ref object_type }
            if entity_type == "status" && object_type == "Person"
    ));
}

#[tokio::test]
async fn abstract_type_accepts_nothing() {
    let h = harness().await;
    let object = registry()
        .codec()
        .decode_document(&work("https://example.com", 1))
        .unwrap();

    let err = h
        .federation
        .apply(&object, &entity_type(entities::BOOK), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::UnsupportedTarget { .. }));
    assert_eq!(h.store.count(entities::BOOK).unwrap(), 0);
}

#[tokio::test]
async fn new_entity_needs_absolute_identity() {
    let h = harness().await;
    let mut doc = person("https://example.com", "mouse");
    doc["id"] = json!("mouse");
    let object = registry().codec().decode_document(&doc).unwrap();

    let err = h
        .federation
        .apply(&object, &entity_type(entities::USER), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::IdentityRequired { ref identifier, .. } if identifier == "mouse"));
    assert_eq!(h.store.count(entities::USER).unwrap(), 0);
}

#[tokio::test]
async fn existing_entity_does_not_need_identity() {
    let h = harness().await;
    let existing = h
        .store
        .create(&entity_type(entities::USER), NewEntity::new("https://example.com/user/mouse", json!({})))
        .unwrap();
    let mut doc = person("https://example.com", "mouse");
    doc["id"] = json!("mouse");
    doc["publicKey"] = json!("https://example.com/user/mouse#main-key");
    h.store
        .create(
            &entity_type(entities::KEY_PAIR),
            NewEntity::new("https://example.com/user/mouse#main-key", json!({})),
        )
        .unwrap();
    let object = registry().codec().decode_document(&doc).unwrap();

    let updated = h
        .federation
        .apply(&object, &entity_type(entities::USER), Some(existing.clone()))
        .await
        .unwrap();
    assert_eq!(updated.id, existing.id);
    assert_eq!(updated.remote_id, "https://example.com/user/mouse");
}

// ── Scalars ─────────────────────────────────────────────────────

#[tokio::test]
async fn scalars_are_assigned() {
    let h = harness().await;
    let object = registry()
        .codec()
        .decode_document(&person("https://example.com", "mouse"))
        .unwrap();

    let user = h
        .federation
        .apply(&object, &entity_type(entities::USER), None)
        .await
        .unwrap();
    assert_eq!(user.remote_id, "https://example.com/user/mouse");
    assert_eq!(user.get_str("/username"), Some("mouse"));
    assert_eq!(user.get_str("/name"), Some("MOUSE"));
    assert_eq!(user.get_str("/inbox"), Some("https://example.com/user/mouse/inbox"));
    assert_eq!(user.get_bool("/bookwyrm_user"), Some(true));
    assert_eq!(user.get_bool("/discoverable"), Some(true));
    assert_eq!(user.get_bool("/manually_approves_followers"), Some(false));
    assert!(user.field("summary").is_none());
    assert!(user.field("avatar").is_none());

    let stored = h.store.get(&user.id).unwrap().unwrap();
    assert_eq!(stored.data, user.data);
}

#[tokio::test]
async fn scalars_overwrite_and_absent_values_are_kept() {
    let h = harness().await;
    let existing = h
        .store
        .create(
            &entity_type(entities::USER),
            NewEntity::new(
                "https://example.com/user/mouse",
                json!({"name": "Old Name", "summary": "keep me", "username": "old"}),
            ),
        )
        .unwrap();
    let object = registry()
        .codec()
        .decode_document(&person("https://example.com", "mouse"))
        .unwrap();

    let user = h
        .federation
        .apply(&object, &entity_type(entities::USER), Some(existing.clone()))
        .await
        .unwrap();
    assert_eq!(user.id, existing.id);
    assert_eq!(user.get_str("/name"), Some("MOUSE"));
    assert_eq!(user.get_str("/username"), Some("mouse"));
    assert_eq!(user.get_str("/summary"), Some("keep me"));
    assert!(user.modified_at >= existing.modified_at);
    assert_eq!(h.store.count(entities::USER).unwrap(), 1);
}

// ── Relations ───────────────────────────────────────────────────

#[tokio::test]
async fn embedded_one_to_one_creates_related_entity() {
    let h = harness().await;
    Mock::given(any()).respond_with(ResponseTemplate::new(500)).expect(0).mount(&h.server).await;
    let object = registry()
        .codec()
        .decode_document(&person("https://example.com", "mouse"))
        .unwrap();

    let user = h
        .federation
        .apply(&object, &entity_type(entities::USER), None)
        .await
        .unwrap();
    let key_id = user.reference("key_pair").unwrap();
    let key = h.store.get(&key_id).unwrap().unwrap();
    assert_eq!(key.entity_type, entities::KEY_PAIR);
    assert_eq!(key.remote_id, "https://example.com/user/mouse#main-key");
    assert_eq!(key.get_str("/public_key"), Some(PUBLIC_KEY_PEM));
}

#[tokio::test]
async fn embedded_one_to_one_updates_linked_entity() {
    let h = harness().await;
    let user_type = entity_type(entities::USER);
    let first = registry()
        .codec()
        .decode_document(&person("https://example.com", "mouse"))
        .unwrap();
    let user = h.federation.apply(&first, &user_type, None).await.unwrap();
    let key_id = user.reference("key_pair").unwrap();

    let mut doc = person("https://example.com", "mouse");
    doc["publicKey"]["publicKeyPem"] = json!("-----BEGIN PUBLIC KEY-----\nROTATED\n-----END PUBLIC KEY-----");
    let second = registry().codec().decode_document(&doc).unwrap();
    let user = h.federation.apply(&second, &user_type, Some(user)).await.unwrap();

    assert_eq!(user.reference("key_pair"), Some(key_id));
    let key = h.store.get(&key_id).unwrap().unwrap();
    assert!(key.get_str("/public_key").unwrap().contains("ROTATED"));
    assert_eq!(h.store.count(entities::KEY_PAIR).unwrap(), 1);
}

#[tokio::test]
async fn bare_reference_is_resolved_remotely() {
    let h = harness().await;
    serve(&h.server, "/user/mouse", &person(&h.base(), "mouse"), 1).await;

    let status = h
        .federation
        .map_document(&note(&h.base(), "mouse", 1), &entity_type(entities::STATUS), None)
        .await
        .unwrap();

    let author = h
        .store
        .query(entities::USER, Lookup::RemoteId, &h.url("/user/mouse"))
        .unwrap()
        .unwrap();
    assert_eq!(status.reference("user"), Some(author.id));
    assert_eq!(status.get_str("/content"), Some("<p>hello</p>"));
    assert_eq!(status.get_str("/published_date"), Some("2020-05-10T02:15:59.635567+00:00"));
    assert_eq!(status.get_bool("/sensitive"), Some(false));
}

#[tokio::test]
async fn bare_reference_to_known_entity_is_not_fetched() {
    let h = harness().await;
    Mock::given(any()).respond_with(ResponseTemplate::new(500)).expect(0).mount(&h.server).await;
    let author = h
        .store
        .create(&entity_type(entities::USER), NewEntity::new(h.url("/user/mouse"), json!({})))
        .unwrap();

    let status = h
        .federation
        .map_document(&note(&h.base(), "mouse", 2), &entity_type(entities::STATUS), None)
        .await
        .unwrap();
    assert_eq!(status.reference("user"), Some(author.id));
}

#[tokio::test]
async fn foreign_key_resolves_across_family() {
    let h = harness().await;
    serve(&h.server, "/book/edition/3", &edition(&h.base(), 3, 4), 1).await;
    serve(&h.server, "/book/work/4", &work(&h.base(), 4), 1).await;
    let author = h
        .store
        .create(&entity_type(entities::USER), NewEntity::new(h.url("/user/mouse"), json!({})))
        .unwrap();

    let mut doc = note(&h.base(), "mouse", 3);
    doc["type"] = json!("Comment");
    doc["inReplyToBook"] = json!(h.url("/book/edition/3"));
    let comment = h
        .federation
        .ingest(&family(entities::STATUS), &doc)
        .await
        .unwrap();

    assert_eq!(comment.entity_type, entities::COMMENT);
    assert_eq!(comment.reference("user"), Some(author.id));
    let book = h.store.get(&comment.reference("book").unwrap()).unwrap().unwrap();
    assert_eq!(book.entity_type, entities::EDITION);
    assert!(book.is_addressed_by(&h.url("/book/edition/3")));
}

#[tokio::test]
async fn failed_relation_fails_the_mapping() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/user/ghost"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .federation
        .map_document(&note(&h.base(), "ghost", 1), &entity_type(entities::STATUS), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::RemoteFetch(_)));
    assert_eq!(h.store.count(entities::STATUS).unwrap(), 0);
}

// ── Attachments ─────────────────────────────────────────────────

#[tokio::test]
async fn reachable_attachment_is_stored() {
    let h = harness().await;
    serve_png(&h.server, "/images/avatar.png").await;
    let mut doc = person(&h.base(), "mouse");
    doc["icon"] = json!({"type": "Image", "url": h.url("/images/avatar.png")});

    let user = h
        .federation
        .map_document(&doc, &entity_type(entities::USER), None)
        .await
        .unwrap();

    let key = user.get_str("/avatar").unwrap();
    assert_eq!(key, format!("user/{}/avatar", user.id));
    assert_eq!(h.blobs.read_key(key).unwrap(), PNG_BYTES);

    let meta = h
        .blobs
        .metadata("user", &format!("{}/avatar", user.id))
        .unwrap()
        .unwrap();
    assert_eq!(meta.format.as_deref(), Some("png"));

    let stored = h.store.get(&user.id).unwrap().unwrap();
    assert_eq!(stored.get_str("/avatar"), Some(key));
}

#[tokio::test]
async fn unreachable_attachment_leaves_field_unset() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/images/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&h.server)
        .await;
    let mut doc = person(&h.base(), "mouse");
    doc["icon"] = json!(h.url("/images/missing.png"));

    let user = h
        .federation
        .map_document(&doc, &entity_type(entities::USER), None)
        .await
        .unwrap();

    assert!(user.field("avatar").is_none());
    let stored = h.store.get(&user.id).unwrap().unwrap();
    assert!(stored.field("avatar").is_none());
    assert_eq!(stored.get_str("/username"), Some("mouse"));
    assert!(h.blobs.list("user").unwrap().is_empty());
}

#[tokio::test]
async fn malformed_attachment_url_is_skipped() {
    let h = harness().await;
    let mut doc = person("https://example.com", "mouse");
    doc["icon"] = json!("ftp://example.com/avatar.png");

    let user = h
        .federation
        .map_document(&doc, &entity_type(entities::USER), None)
        .await
        .unwrap();
    assert!(user.field("avatar").is_none());
}

#[tokio::test]
async fn failed_attachment_keeps_previous_key() {
    let h = harness().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;
    let existing = h
        .store
        .create(
            &entity_type(entities::USER),
            NewEntity::new(h.url("/user/mouse"), json!({"avatar": "user/old/avatar"})),
        )
        .unwrap();
    h.store
        .create(
            &entity_type(entities::KEY_PAIR),
            NewEntity::new(h.url("/user/mouse#main-key"), json!({})),
        )
        .unwrap();
    let mut doc = person(&h.base(), "mouse");
    doc["icon"] = json!(h.url("/images/new.png"));

    let user = h
        .federation
        .map_document(&doc, &entity_type(entities::USER), Some(existing))
        .await
        .unwrap();
    assert_eq!(user.get_str("/avatar"), Some("user/old/avatar"));
}

// ── Full documents ──────────────────────────────────────────────

#[tokio::test]
async fn map_document_validates_first() {
    let h = harness().await;
    let doc = json!({"id": "https://example.com/user/x", "type": "Person"});
    let err = h
        .federation
        .map_document(&doc, &entity_type(entities::USER), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FederationError::SchemaValidation(SchemaValidationError::MissingField { .. })
    ));
}

#[tokio::test]
async fn ingest_updates_known_entity() {
    let h = harness().await;
    h.store
        .create(&entity_type(entities::USER), NewEntity::new(h.url("/user/mouse"), json!({})))
        .unwrap();
    let mut doc = note(&h.base(), "mouse", 9);
    doc["type"] = json!("Review");
    doc["inReplyToBook"] = json!(edition(&h.base(), 5, 6));
    doc["inReplyToBook"]["work"] = json!(work(&h.base(), 6));
    doc["rating"] = json!(4);

    let statuses = family(entities::STATUS);
    let review = h.federation.ingest(&statuses, &doc).await.unwrap();
    assert_eq!(review.entity_type, entities::REVIEW);
    assert_eq!(review.get_number("/rating"), Some(4.0));

    doc["rating"] = json!(5);
    let again = h.federation.ingest(&statuses, &doc).await.unwrap();
    assert_eq!(again.id, review.id);
    assert_eq!(again.get_number("/rating"), Some(5.0));
    assert_eq!(again.reference("book"), review.reference("book"));
    assert_eq!(h.store.count(entities::REVIEW).unwrap(), 1);
    assert_eq!(h.store.count(entities::EDITION).unwrap(), 1);
    assert_eq!(h.store.count(entities::WORK).unwrap(), 1);
}

// ── Concurrent ingest ───────────────────────────────────────────

#[tokio::test]
async fn concurrent_ingests_of_one_document_create_one_entity() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/user/mouse"))
        .respond_with(activity(&person(&h.base(), "mouse")).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&h.server)
        .await;

    let statuses = family(entities::STATUS);
    let doc = note(&h.base(), "mouse", 1);
    let (first, second) = tokio::join!(
        h.federation.ingest(&statuses, &doc),
        h.federation.ingest(&statuses, &doc)
    );

    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.id, second.id);
    assert_eq!(second.reference("user"), first.reference("user"));
    assert_eq!(h.store.count(entities::STATUS).unwrap(), 1);
    assert_eq!(h.store.count(entities::USER).unwrap(), 1);
    assert_eq!(h.federation.in_flight(), 0);
}

#[tokio::test]
async fn ingest_waits_for_resolution_of_same_identifier() {
    let h = harness().await;
    serve(&h.server, "/user/mouse", &person(&h.base(), "mouse"), 1).await;
    let doc = note(&h.base(), "mouse", 2);
    Mock::given(method("GET"))
        .and(path("/user/mouse/status/2"))
        .respond_with(activity(&doc).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&h.server)
        .await;

    let statuses = family(entities::STATUS);
    let id = h.url("/user/mouse/status/2");
    let (resolved, ingested) = tokio::join!(
        h.federation.resolve(&statuses, &id),
        h.federation.ingest(&statuses, &doc)
    );

    assert_eq!(resolved.unwrap().id, ingested.unwrap().id);
    assert_eq!(h.store.count(entities::STATUS).unwrap(), 1);
}
