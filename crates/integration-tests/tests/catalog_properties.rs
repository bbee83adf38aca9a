//! Catalog behavior across repositories, the asset gateway and both views.
//!
//! Runs against the in-memory stores; no database needed.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use reve_essence_catalog::memory::{MemoryCatalogStore, MemoryObjectStore};
use reve_essence_catalog::{
    AssetGateway, CategoryRepository, ChangeEvent, ChangeNotifier, ImageUpload, OrphanPolicy,
    ProductRepository, ProductSubmission, SweepOptions,
};
use reve_essence_core::{
    CatalogError, CategoryId, ImageLocator, LabelSet, Price, ProductDraft, ProductId, Slug,
};
use reve_essence_integration_tests::{TestCatalog, draft, eventually};

fn repositories() -> (CategoryRepository, ProductRepository, ChangeNotifier) {
    let store = Arc::new(MemoryCatalogStore::new());
    let notifier = ChangeNotifier::new();
    (
        CategoryRepository::new(store.clone(), notifier.clone()),
        ProductRepository::new(store.clone(), store, notifier.clone()),
        notifier,
    )
}

fn with_image(category_id: CategoryId, name: &str) -> ProductDraft {
    ProductDraft {
        image_paths: vec![ImageLocator::new(format!(
            "http://assets.test/product-images/products/1-{name}.jpg"
        ))],
        ..draft(category_id, name)
    }
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_created_category_listed_once_with_normalized_slug() {
    let (categories, _, _) = repositories();

    for name in ["Wrist Watches", "  Perfume   Oils ", "RINGS", "Anklets\tand  Toe Rings"] {
        let created = categories.create(name).await.unwrap();
        let listed = categories.list().await.unwrap();

        let expected = name
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        let matching: Vec<_> = listed
            .iter()
            .filter(|c| c.slug.as_str() == expected)
            .collect();
        assert_eq!(matching.len(), 1, "slug {expected}");
        assert_eq!(matching[0].id, created.id);
    }
}

#[tokio::test]
async fn test_wrist_watches_slug() {
    let (categories, _, _) = repositories();
    let category = categories.create("Wrist Watches").await.unwrap();
    assert_eq!(category.slug, Slug::from_name("wrist watches").unwrap());
    assert_eq!(category.slug.as_str(), "wrist-watches");
}

#[tokio::test]
async fn test_same_slug_conflicts_and_adds_nothing() {
    let (categories, _, _) = repositories();
    categories.create("Shoes ").await.unwrap();

    let err = categories.create("shoes").await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let listed = categories.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Shoes");
}

#[tokio::test]
async fn test_blank_category_name_rejected() {
    let (categories, _, _) = repositories();
    let err = categories.create(" \t ").await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation(ref v) if v.field == "name"));
    assert!(categories.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_categories_sorted_by_name() {
    let (categories, _, _) = repositories();
    for name in ["Rings", "Bags", "Perfumes"] {
        categories.create(name).await.unwrap();
    }
    let names: Vec<_> = categories
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Bags", "Perfumes", "Rings"]);
}

#[tokio::test]
async fn test_delete_category_cascades_to_products() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();
    let bags = categories.create("Bags").await.unwrap();
    let watch = products.create(with_image(watches.id, "Royal Oak")).await.unwrap();
    let bag = products.create(with_image(bags.id, "Tote")).await.unwrap();

    let removal = categories.delete(watches.id).await.unwrap();
    assert_eq!(removal.cascaded_products.len(), 1);
    assert_eq!(removal.cascaded_products[0].id, watch.id);

    let remaining_categories = categories.list().await.unwrap();
    assert!(remaining_categories.iter().all(|c| c.id != watches.id));

    let remaining: Vec<_> = products
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.product.id)
        .collect();
    assert_eq!(remaining, [bag.id]);
}

#[tokio::test]
async fn test_delete_missing_category_not_found() {
    let (categories, _, _) = repositories();
    let err = categories.delete(CategoryId::generate()).await.unwrap_err();
    assert!(err.is_stale_state());
}

#[tokio::test]
async fn test_preview_delete_counts_products() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();
    products.create(with_image(watches.id, "Royal Oak")).await.unwrap();
    products.create(with_image(watches.id, "Nautilus")).await.unwrap();

    assert_eq!(categories.preview_delete(watches.id).await.unwrap(), 2);
    // Preview is read-only
    assert_eq!(products.list().await.unwrap().len(), 2);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_empty_image_list_always_rejected() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();
    let existing = products.create(with_image(watches.id, "Royal Oak")).await.unwrap();

    let err = products.create(draft(watches.id, "Nautilus")).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation(ref v) if v.field == "image_paths"));

    let err = products
        .update(existing.id, draft(watches.id, "Royal Oak II"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(ref v) if v.field == "image_paths"));

    assert_eq!(products.get(existing.id).await.unwrap(), existing);
}

#[tokio::test]
async fn test_first_failing_field_reported() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();

    let cases: [(&str, fn(&mut ProductDraft)); 5] = [
        ("name", |d| d.name = "  ".to_owned()),
        ("description", |d| d.description = String::new()),
        ("material", |d| d.material = "\n".to_owned()),
        ("price", |d| d.price = "-5".to_owned()),
        ("category_id", |d| d.category_id = Some(CategoryId::generate())),
    ];
    for (field, break_it) in cases {
        let mut bad = with_image(watches.id, "Royal Oak");
        break_it(&mut bad);
        let err = products.create(bad).await.unwrap_err();
        assert!(
            matches!(err, CatalogError::Validation(ref v) if v.field == field),
            "{field}: {err}"
        );
    }
    assert!(products.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_missing_product_leaves_records_unchanged() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();
    products.create(with_image(watches.id, "Royal Oak")).await.unwrap();
    let before = products.list().await.unwrap();

    let err = products
        .update(ProductId::generate(), with_image(watches.id, "Ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
    assert_eq!(products.list().await.unwrap(), before);
}

#[tokio::test]
async fn test_update_replaces_every_field() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();
    let bags = categories.create("Bags").await.unwrap();
    let original = products.create(with_image(watches.id, "Royal Oak")).await.unwrap();

    let mut replacement = with_image(bags.id, "Tote");
    replacement.sizes = ["M"].into_iter().collect();
    replacement.colors = LabelSet::new();
    let updated = products.update(original.id, replacement).await.unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(updated.name, "Tote");
    assert_eq!(updated.category_id, bags.id);
    assert!(updated.colors.is_empty());
    assert!(updated.sizes.contains("M"));
}

#[tokio::test]
async fn test_delete_missing_product_not_found() {
    let (_, products, _) = repositories();
    let err = products.delete(ProductId::generate()).await.unwrap_err();
    assert!(err.is_stale_state());
}

#[tokio::test]
async fn test_products_newest_first() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();
    for name in ["First", "Second", "Third"] {
        products.create(with_image(watches.id, name)).await.unwrap();
    }
    let names: Vec<_> = products
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.product.name)
        .collect();
    assert_eq!(names, ["Third", "Second", "First"]);
}

#[tokio::test]
async fn test_listing_twice_is_identical() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();
    categories.create("Bags").await.unwrap();
    products.create(with_image(watches.id, "Royal Oak")).await.unwrap();
    products.create(with_image(watches.id, "Nautilus")).await.unwrap();

    assert_eq!(categories.list().await.unwrap(), categories.list().await.unwrap());
    assert_eq!(products.list().await.unwrap(), products.list().await.unwrap());
}

#[tokio::test]
async fn test_wrist_watch_scenario() {
    let (categories, products, _) = repositories();
    let watches = categories.create("Wrist Watches").await.unwrap();
    assert_eq!(watches.slug.as_str(), "wrist-watches");

    products.create(with_image(watches.id, "Royal Oak")).await.unwrap();

    let listed = products.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].product.sizes.is_empty());
    assert_eq!(listed[0].product.colors.as_slice(), ["Gold"]);
    assert_eq!(listed[0].product.price, Price::parse("125000").unwrap());
    assert_eq!(listed[0].product.image_paths.len(), 1);
    assert_eq!(listed[0].category_name, "Wrist Watches");
}

#[tokio::test]
async fn test_writes_publish_changes() {
    let (categories, products, notifier) = repositories();
    let mut events = notifier.subscribe();

    let watches = categories.create("Wrist Watches").await.unwrap();
    assert_eq!(events.recv().await.unwrap(), ChangeEvent::CategoriesChanged);

    let product = products.create(with_image(watches.id, "Royal Oak")).await.unwrap();
    assert_eq!(events.recv().await.unwrap(), ChangeEvent::ProductsChanged);

    products.delete(product.id).await.unwrap();
    assert_eq!(events.recv().await.unwrap(), ChangeEvent::ProductsChanged);

    // Failed writes publish nothing
    assert!(categories.create("wrist watches").await.is_err());
    assert!(events.try_recv().is_err());
}

// =============================================================================
// Asset gateway
// =============================================================================

#[tokio::test]
async fn test_remove_ignores_foreign_locators() {
    let objects = Arc::new(MemoryObjectStore::default());
    let gateway = AssetGateway::new(objects.clone());
    let locator = gateway.upload(vec![1, 2, 3], "photo.png").await.unwrap();
    assert_eq!(objects.len().await, 1);

    for foreign in [
        "https://images.example.com/photo.png",
        "not a url",
        "",
    ] {
        gateway.remove(&ImageLocator::new(foreign)).await.unwrap();
    }
    assert_eq!(objects.len().await, 1);

    gateway.remove(&locator).await.unwrap();
    assert!(objects.is_empty().await);
    // Removing twice is fine
    gateway.remove(&locator).await.unwrap();
}

#[tokio::test]
async fn test_upload_keys_are_unique_and_keep_extension() {
    let objects = Arc::new(MemoryObjectStore::default());
    let gateway = AssetGateway::new(objects.clone());

    let mut locators = Vec::new();
    for _ in 0..20 {
        locators.push(gateway.upload(vec![0], "Royal Oak.JPG").await.unwrap());
    }
    assert_eq!(objects.len().await, 20);
    assert!(
        locators
            .iter()
            .all(|l| l.as_str().to_lowercase().ends_with(".jpg"))
    );
}

// =============================================================================
// Synchronizer across two views
// =============================================================================

#[tokio::test]
async fn test_storefront_view_follows_admin_writes() {
    let catalog = TestCatalog::new();
    assert!(catalog.storefront.products().await.unwrap().is_empty());

    let watches = catalog.seed_category("Wrist Watches").await;
    let product = catalog.seed_product(watches.id, "Royal Oak", 2).await;

    // The writer's own view is current immediately
    assert_eq!(catalog.admin.products().await.unwrap().len(), 1);

    assert!(
        eventually(|| async {
            catalog
                .storefront
                .products()
                .await
                .unwrap()
                .iter()
                .any(|l| l.product.id == product.id)
        })
        .await
    );
}

#[tokio::test]
async fn test_category_delete_reaches_storefront_sections() {
    let catalog = TestCatalog::new();
    let watches = catalog.seed_category("Wrist Watches").await;
    catalog.seed_product(watches.id, "Royal Oak", 1).await;
    assert!(
        eventually(|| async { catalog.storefront.sections().await.unwrap().len() == 1 }).await
    );

    catalog
        .admin
        .delete_category(&catalog.session, watches.id)
        .await
        .unwrap();

    assert!(
        eventually(|| async {
            catalog.storefront.sections().await.unwrap().is_empty()
                && catalog.storefront.products().await.unwrap().is_empty()
        })
        .await
    );
    assert!(catalog.objects.is_empty().await);
}

#[tokio::test]
async fn test_failed_upload_leaves_no_product() {
    let catalog = TestCatalog::new();
    let watches = catalog.seed_category("Wrist Watches").await;
    catalog.objects.fail_puts_after(1).await;

    let submission = ProductSubmission {
        draft: draft(watches.id, "Royal Oak"),
        uploads: vec![
            ImageUpload::new("front.jpg", vec![1]),
            ImageUpload::new("back.jpg", vec![2]),
        ],
    };
    let err = catalog
        .admin
        .create_product(&catalog.session, submission)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Upload(_)));
    assert!(catalog.admin.products().await.unwrap().is_empty());
    // The first image stays behind until a sweep
    assert_eq!(catalog.objects.len().await, 1);
}

#[tokio::test]
async fn test_sweep_removes_leaked_uploads() {
    let catalog = TestCatalog::new();
    let watches = catalog.seed_category("Wrist Watches").await;
    let kept = catalog.seed_product(watches.id, "Royal Oak", 2).await;

    let leaked = catalog.admin.assets().upload(vec![9], "leak.jpg").await.unwrap();
    assert_eq!(catalog.objects.len().await, 3);

    let listings = catalog.admin.products().await.unwrap();
    let referenced = listings.iter().flat_map(|l| l.product.image_paths.iter());
    let report = catalog
        .admin
        .assets()
        .sweep_orphans(
            referenced,
            SweepOptions {
                dry_run: false,
                grace: std::time::Duration::ZERO,
            },
        )
        .await
        .unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.orphaned.len(), 1);
    assert_eq!(Some(&report.orphaned[0]), leaked.storage_key("product-images").as_ref());
    assert_eq!(catalog.objects.len().await, 2);
    for locator in &kept.image_paths {
        let key = locator.storage_key("product-images").unwrap();
        assert!(catalog.objects.get(&key).await.is_some());
    }
}

#[tokio::test]
async fn test_retain_policy_keeps_images_of_deleted_products() {
    let catalog = TestCatalog::with_policy(OrphanPolicy::Retain);
    let watches = catalog.seed_category("Wrist Watches").await;
    let product = catalog.seed_product(watches.id, "Royal Oak", 2).await;

    catalog
        .admin
        .delete_product(&catalog.session, product.id)
        .await
        .unwrap();
    assert_eq!(catalog.objects.len().await, 2);
}
