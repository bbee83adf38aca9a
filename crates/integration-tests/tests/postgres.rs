//! `PostgreSQL` store, migrations and change feed.
//!
//! These tests require a running `PostgreSQL` database reachable through
//! `CATALOG_DATABASE_URL`. Each test names its records with a random suffix
//! so the suite can share one database and run in parallel.
//!
//! Run with: `cargo test -p reve-essence-integration-tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use reve_essence_catalog::memory::MemoryObjectStore;
use reve_essence_catalog::{
    CatalogSynchronizer, CategoryRepository, ChangeEvent, ChangeNotifier, ImageUpload, MIGRATOR,
    PgCatalogStore, PgChangeFeed, ProductRepository, ProductSubmission, SyncOptions, create_pool,
};
use reve_essence_core::{AdminSession, CatalogError, ImageLocator, ProductDraft, ProductId};
use reve_essence_integration_tests::{draft, eventually};

async fn store() -> Arc<PgCatalogStore> {
    let url = std::env::var("CATALOG_DATABASE_URL").expect("CATALOG_DATABASE_URL must be set");
    let pool = create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");
    Arc::new(PgCatalogStore::new(pool))
}

fn unique(name: &str) -> String {
    format!("{name} {}", uuid::Uuid::new_v4().simple())
}

fn with_image(draft: ProductDraft) -> ProductDraft {
    ProductDraft {
        image_paths: vec![ImageLocator::new(
            "https://cdn.reveessence.ng/storage/v1/object/public/product-images/products/1-a.jpg",
        )],
        ..draft
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_category_slug_unique_in_database() {
    let store = store().await;
    let categories = CategoryRepository::new(store, ChangeNotifier::new());

    let name = unique("Wrist Watches");
    let created = categories.create(&format!("  {name} ")).await.unwrap();
    assert_eq!(created.name, name);

    let err = categories
        .create(&name.to_uppercase())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let matching = categories
        .list()
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.slug == created.slug)
        .count();
    assert_eq!(matching, 1);

    categories.delete(created.id).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_product_round_trip_and_cascade() {
    let store = store().await;
    let notifier = ChangeNotifier::new();
    let categories = CategoryRepository::new(store.clone(), notifier.clone());
    let products = ProductRepository::new(store.clone(), store, notifier);

    let watches = categories.create(&unique("Wrist Watches")).await.unwrap();
    let mut new = with_image(draft(watches.id, "Royal Oak"));
    new.sizes = ["40mm", "42mm", "40mm"].into_iter().collect();
    let created = products.create(new).await.unwrap();

    let fetched = products.get(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.sizes.as_slice(), ["40mm", "42mm"]);
    assert_eq!(fetched.colors.as_slice(), ["Gold"]);
    assert_eq!(fetched.price.to_string(), "125000");

    let listing = products
        .list()
        .await
        .unwrap()
        .into_iter()
        .find(|l| l.product.id == created.id)
        .unwrap();
    assert_eq!(listing.category_name, watches.name);

    assert_eq!(categories.preview_delete(watches.id).await.unwrap(), 1);
    let removal = categories.delete(watches.id).await.unwrap();
    assert_eq!(removal.cascaded_products.len(), 1);
    assert!(products.get(created.id).await.unwrap_err().is_stale_state());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_update_missing_product_not_found() {
    let store = store().await;
    let notifier = ChangeNotifier::new();
    let categories = CategoryRepository::new(store.clone(), notifier.clone());
    let products = ProductRepository::new(store.clone(), store, notifier);

    let watches = categories.create(&unique("Wrist Watches")).await.unwrap();
    let err = products
        .update(ProductId::generate(), with_image(draft(watches.id, "Ghost")))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));

    categories.delete(watches.id).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_change_feed_reaches_other_process_view() {
    let store = store().await;
    let objects = Arc::new(MemoryObjectStore::default());

    // Two processes: each with its own notifier, joined only by the database
    let admin_notifier = ChangeNotifier::new();
    let admin = CatalogSynchronizer::new(
        store.clone(),
        objects.clone(),
        admin_notifier,
        SyncOptions::default(),
    );

    let storefront_notifier = ChangeNotifier::new();
    let mut events = storefront_notifier.subscribe();
    let feed = PgChangeFeed::spawn(store.pool(), storefront_notifier.clone())
        .await
        .unwrap();
    let storefront = CatalogSynchronizer::new(
        store.clone(),
        objects,
        storefront_notifier,
        SyncOptions::default(),
    );
    let invalidation = storefront.spawn_invalidation();

    let session = AdminSession::new("ops@reveessence.ng");
    let watches = admin
        .create_category(&session, &unique("Wrist Watches"))
        .await
        .unwrap();
    // Other tests share the database, so skip their product events
    let saw_categories = tokio::time::timeout(Duration::from_secs(5), async {
        while events.recv().await.unwrap() != ChangeEvent::CategoriesChanged {}
    })
    .await;
    assert!(saw_categories.is_ok());

    // Fill the storefront cache, then write from the admin side
    storefront.products().await.unwrap();
    let product = admin
        .create_product(
            &session,
            ProductSubmission {
                draft: draft(watches.id, "Royal Oak"),
                uploads: vec![ImageUpload::new("front.jpg", vec![1, 2, 3])],
            },
        )
        .await
        .unwrap();

    assert!(
        eventually(|| async {
            storefront
                .products()
                .await
                .unwrap()
                .iter()
                .any(|l| l.product.id == product.id)
        })
        .await
    );

    admin.delete_category(&session, watches.id).await.unwrap();
    assert!(
        eventually(|| async {
            storefront
                .products()
                .await
                .unwrap()
                .iter()
                .all(|l| l.product.id != product.id)
        })
        .await
    );

    feed.abort();
    invalidation.abort();
}
