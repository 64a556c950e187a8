//! Shared harness for federation tests.

#![allow(dead_code)]

use std::sync::Arc;

use quire_federation::{Federation, FederationConfig, HttpFetcher};
use quire_model::{EntityCatalog, EntityFamily, EntityType, SchemaRegistry};
use quire_storage::{BlobStore, EntityStore};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DOMAIN: &str = "local.test";

pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

pub const PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----\nMIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA\n-----END PUBLIC KEY-----";

pub struct Harness {
    pub server: MockServer,
    pub federation: Federation,
    pub store: Arc<EntityStore>,
    pub blobs: Arc<BlobStore>,
}

impl Harness {
    /// Base URL of the mock peer.
    pub fn base(&self) -> String {
        self.server.uri()
    }

    pub fn url(&self, p: &str) -> String {
        format!("{}{}", self.server.uri(), p)
    }
}

pub fn test_config() -> FederationConfig {
    FederationConfig {
        local_domain: DOMAIN.to_string(),
        request_timeout_secs: 5,
        ..Default::default()
    }
}

pub async fn harness() -> Harness {
    harness_with(test_config()).await
}

pub async fn harness_with(config: FederationConfig) -> Harness {
    let server = MockServer::start().await;
    let (federation, store, blobs) = build(config);
    Harness {
        server,
        federation,
        store,
        blobs,
    }
}

/// Routes federation logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn build(config: FederationConfig) -> (Federation, Arc<EntityStore>, Arc<BlobStore>) {
    init_tracing();
    let store = Arc::new(EntityStore::open_in_memory(&config.local_domain).unwrap());
    let blobs = Arc::new(BlobStore::open_with_conn(store.connection()).unwrap());
    let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
    let federation = Federation::new(config, store.clone(), blobs.clone(), fetcher);
    (federation, store, blobs)
}

pub fn family(name: &str) -> EntityFamily {
    EntityCatalog::global().family(name).unwrap()
}

pub fn entity_type(name: &str) -> Arc<EntityType> {
    EntityCatalog::global().entity_type(name).unwrap().clone()
}

pub fn registry() -> &'static SchemaRegistry {
    SchemaRegistry::global()
}

/// A federation document response.
pub fn activity(doc: &Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(serde_json::to_vec(doc).unwrap(), "application/activity+json")
}

/// Serves `doc` at `p`, expecting exactly `times` requests.
pub async fn serve(server: &MockServer, p: &str, doc: &Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(activity(doc))
        .expect(times)
        .mount(server)
        .await;
}

pub async fn serve_png(server: &MockServer, p: &str) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(PNG_BYTES.to_vec()),
        )
        .expect(1)
        .mount(server)
        .await;
}

// ── Fixtures ────────────────────────────────────────────────────

pub fn person(base: &str, username: &str) -> Value {
    let id = format!("{base}/user/{username}");
    json!({
        "@context": [
            "https://www.w3.org/ns/activitystreams",
            "https://w3id.org/security/v1"
        ],
        "id": id,
        "type": "Person",
        "preferredUsername": username,
        "name": username.to_uppercase(),
        "inbox": format!("{id}/inbox"),
        "outbox": format!("{id}/outbox"),
        "followers": format!("{id}/followers"),
        "publicKey": {
            "id": format!("{id}#main-key"),
            "owner": id,
            "publicKeyPem": PUBLIC_KEY_PEM,
        },
        "manuallyApprovesFollowers": false,
    })
}

pub fn work(base: &str, n: u32) -> Value {
    json!({
        "id": format!("{base}/book/work/{n}"),
        "type": "Work",
        "title": "Test Work",
        "lccn": "2020012345",
    })
}

pub fn edition(base: &str, n: u32, work_n: u32) -> Value {
    json!({
        "id": format!("{base}/book/edition/{n}"),
        "type": "Edition",
        "title": "Test Edition",
        "isbn13": "9780300000000",
        "pages": 250,
        "work": format!("{base}/book/work/{work_n}"),
    })
}

pub fn note(base: &str, author: &str, n: u32) -> Value {
    json!({
        "id": format!("{base}/user/{author}/status/{n}"),
        "type": "Note",
        "attributedTo": format!("{base}/user/{author}"),
        "content": "<p>hello</p>",
        "published": "2020-05-10T02:15:59.635567+00:00",
        "to": ["https://www.w3.org/ns/activitystreams#Public"],
    })
}
