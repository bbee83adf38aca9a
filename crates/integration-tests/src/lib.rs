//! Integration tests for Reve Essence.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (memory stores, no network)
//! cargo test -p reve-essence-integration-tests
//!
//! # Tests that need PostgreSQL or running servers
//! CATALOG_DATABASE_URL=postgres://localhost/reve_test \
//!     cargo test -p reve-essence-integration-tests -- --ignored
//! ```
//!
//! # Test Suites
//!
//! - `catalog_properties` - Repository and synchronizer behavior
//! - `admin_api` - Admin HTTP API
//! - `storefront_api` - Storefront reads and the change stream
//! - `postgres` - `PostgreSQL` store, migrations and change feed
//! - `deployed` - Smoke tests against running binaries
//!
//! Every in-process test builds a [`TestCatalog`]: one shared store, bucket
//! and notifier with two independent views over them, the way the admin and
//! storefront binaries share a database.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, header, request::Builder},
    response::Response,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower::ServiceExt;

use reve_essence_admin::middleware::SessionProvider;
use reve_essence_catalog::assets::DEFAULT_BUCKET;
use reve_essence_catalog::memory::{MemoryCatalogStore, MemoryObjectStore};
use reve_essence_catalog::{
    CatalogSynchronizer, ChangeNotifier, ImageUpload, OrphanPolicy, ProductSubmission, SyncOptions,
};
use reve_essence_core::{AdminSession, Category, CategoryId, Product, ProductDraft};

/// Bearer token accepted by [`TestCatalog::admin_router`].
pub const ADMIN_TOKEN: &str = "k7#Qm2!vX9@pL4$wR8%tY1^zN6&bH3*d";

/// Subject recorded on admin sessions in tests.
pub const ADMIN_SUBJECT: &str = "ops@reveessence.ng";

/// Public base URL of the in-memory bucket.
pub const ASSET_BASE_URL: &str = "http://assets.test";

/// Boundary used by [`MultipartBody`].
pub const BOUNDARY: &str = "reve-essence-test-boundary";

/// A catalog shared by an admin view and a storefront view.
pub struct TestCatalog {
    pub store: Arc<MemoryCatalogStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub notifier: ChangeNotifier,
    /// The view the admin API writes through.
    pub admin: CatalogSynchronizer,
    /// An independent view, as the storefront process has.
    pub storefront: CatalogSynchronizer,
    pub session: AdminSession,
    tasks: Vec<JoinHandle<()>>,
}

impl TestCatalog {
    /// Build a catalog that reclaims released images.
    ///
    /// Must be called inside a Tokio runtime: each view starts its
    /// invalidation listener.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(OrphanPolicy::Reclaim)
    }

    #[must_use]
    pub fn with_policy(orphan_policy: OrphanPolicy) -> Self {
        let store = Arc::new(MemoryCatalogStore::new());
        let objects = Arc::new(MemoryObjectStore::new(ASSET_BASE_URL, DEFAULT_BUCKET));
        let notifier = ChangeNotifier::new();
        let options = SyncOptions {
            orphan_policy,
            ..SyncOptions::default()
        };

        let admin =
            CatalogSynchronizer::new(store.clone(), objects.clone(), notifier.clone(), options);
        let storefront =
            CatalogSynchronizer::new(store.clone(), objects.clone(), notifier.clone(), options);
        let tasks = vec![admin.spawn_invalidation(), storefront.spawn_invalidation()];

        Self {
            store,
            objects,
            notifier,
            admin,
            storefront,
            session: AdminSession::new(ADMIN_SUBJECT),
            tasks,
        }
    }

    /// Admin API router over the admin view.
    #[must_use]
    pub fn admin_router(&self) -> Router {
        let sessions = SessionProvider::new(&SecretString::from(ADMIN_TOKEN), ADMIN_SUBJECT);
        reve_essence_admin::routes::routes()
            .with_state(reve_essence_admin::AppState::new(self.admin.clone(), sessions))
    }

    /// Storefront API router over the storefront view.
    #[must_use]
    pub fn storefront_router(&self) -> Router {
        reve_essence_storefront::routes::routes()
            .with_state(reve_essence_storefront::AppState::new(self.storefront.clone()))
    }

    /// Create a category through the admin view.
    ///
    /// # Panics
    ///
    /// Panics if the category cannot be created.
    pub async fn seed_category(&self, name: &str) -> Category {
        self.admin
            .create_category(&self.session, name)
            .await
            .expect("Failed to seed category")
    }

    /// Create a product with `images` freshly uploaded images.
    ///
    /// # Panics
    ///
    /// Panics if the product cannot be created.
    pub async fn seed_product(&self, category_id: CategoryId, name: &str, images: u8) -> Product {
        let submission = ProductSubmission {
            draft: draft(category_id, name),
            uploads: (0..images)
                .map(|i| ImageUpload::new(format!("{name}-{i}.jpg"), vec![i; 8]))
                .collect(),
        };
        self.admin
            .create_product(&self.session, submission)
            .await
            .expect("Failed to seed product")
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestCatalog {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// A valid draft with no images attached yet.
#[must_use]
pub fn draft(category_id: CategoryId, name: &str) -> ProductDraft {
    ProductDraft {
        name: name.to_owned(),
        description: "Hand-finished in Lagos".to_owned(),
        price: "125000".to_owned(),
        category_id: Some(category_id),
        material: "Gold".to_owned(),
        colors: ["Gold"].into_iter().collect(),
        ..ProductDraft::default()
    }
}

/// The JSON `product` part for a draft.
#[must_use]
pub fn draft_json(category_id: CategoryId, name: &str) -> Value {
    json!({
        "name": name,
        "description": "Hand-finished in Lagos",
        "price": "125000",
        "category_id": category_id,
        "material": "Gold",
        "sizes": [],
        "colors": ["Gold"],
        "image_paths": [],
    })
}

// =============================================================================
// HTTP helpers
// =============================================================================

/// Request builder carrying the admin bearer token.
#[must_use]
pub fn authorized(method: Method, uri: &str) -> Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
}

/// Unauthenticated GET.
///
/// # Panics
///
/// Panics if `uri` is not a valid URI.
#[must_use]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

/// JSON request carrying the admin bearer token.
///
/// # Panics
///
/// Panics if `uri` is not a valid URI.
#[must_use]
pub fn authorized_json(method: Method, uri: &str, body: &Value) -> Request<Body> {
    authorized(method, uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

/// Run one request through a router.
///
/// # Panics
///
/// Never in practice; routers are infallible services.
pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("Router is infallible")
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body cannot be read or is not JSON.
pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Poll `check` until it returns true or about a second has passed.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Hand-assembled `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a JSON part.
    #[must_use]
    pub fn json(mut self, name: &str, value: &Value) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\
                 Content-Type: application/json\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Add a file part.
    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(content);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    /// Close the body and wrap it in an authorized request.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid URI.
    #[must_use]
    pub fn into_request(mut self, method: Method, uri: &str) -> Request<Body> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        authorized(method, uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.bytes))
            .expect("Failed to build request")
    }
}
