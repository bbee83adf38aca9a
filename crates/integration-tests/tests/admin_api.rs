//! Admin API over in-memory stores.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};

use reve_essence_integration_tests::{
    MultipartBody, TestCatalog, authorized, authorized_json, draft_json, eventually, get,
    json_body, send,
};

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoints_are_public() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();

    for uri in ["/health", "/health/ready"] {
        let response = send(&router, get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();

    let response = send(&router, get("/api/categories")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    assert_eq!(json_body(response).await["error"], "Missing bearer token");
}

#[tokio::test]
async fn test_wrong_token_rejected_without_writing() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/categories")
        .header(header::AUTHORIZATION, "Bearer not-the-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"name": "Rings"}).to_string()))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(catalog.admin.categories().await.unwrap().is_empty());
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_create_and_list_categories() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();

    let response = send(
        &router,
        authorized_json(Method::POST, "/api/categories", &json!({"name": "Wrist Watches"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["name"], "Wrist Watches");
    assert_eq!(created["slug"], "wrist-watches");

    let response = send(
        &router,
        authorized(Method::GET, "/api/categories")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);
}

#[tokio::test]
async fn test_duplicate_slug_is_conflict() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    catalog.seed_category("Shoes ").await;

    let response = send(
        &router,
        authorized_json(Method::POST, "/api/categories", &json!({"name": "shoes"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(catalog.admin.categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_category_is_unprocessable() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();

    let response = send(
        &router,
        authorized_json(Method::POST, "/api/categories", &json!({"name": "   "})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["field"], "name");
}

#[tokio::test]
async fn test_delete_impact_then_delete() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;
    catalog.seed_product(watches.id, "Royal Oak", 1).await;
    catalog.seed_product(watches.id, "Nautilus", 2).await;

    let response = send(
        &router,
        authorized(Method::GET, &format!("/api/categories/{}/impact", watches.id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["product_count"], 2);

    let response = send(
        &router,
        authorized(Method::DELETE, &format!("/api/categories/{}", watches.id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["removed_products"], 2);
    assert_eq!(body["category"]["slug"], "wrist-watches");

    assert!(catalog.admin.products().await.unwrap().is_empty());
    assert!(catalog.objects.is_empty().await);
}

#[tokio::test]
async fn test_delete_unknown_category_not_found() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();

    let response = send(
        &router,
        authorized(
            Method::DELETE,
            &format!("/api/categories/{}", uuid::Uuid::new_v4()),
        )
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_create_product_with_images() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;

    let request = MultipartBody::new()
        .json("product", &draft_json(watches.id, "Royal Oak"))
        .file("images", "front.JPG", b"front")
        .file("images", "back.png", b"back")
        .into_request(Method::POST, "/api/products");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let product = json_body(response).await;
    let images = product["image_paths"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert!(images[0].as_str().unwrap().ends_with(".jpg"));
    assert!(images[1].as_str().unwrap().ends_with(".png"));
    assert_eq!(product["colors"], json!(["Gold"]));
    assert_eq!(catalog.objects.len().await, 2);

    let listed = catalog.admin.products().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].category_name, "Wrist Watches");
}

#[tokio::test]
async fn test_product_without_images_is_unprocessable() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;

    let request = MultipartBody::new()
        .json("product", &draft_json(watches.id, "Royal Oak"))
        // A file input left blank
        .file("images", "", b"")
        .into_request(Method::POST, "/api/products");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["field"], "image_paths");
    assert!(catalog.objects.is_empty().await);
}

#[tokio::test]
async fn test_invalid_field_uploads_nothing() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;

    let mut product = draft_json(watches.id, "Royal Oak");
    product["price"] = Value::from("twelve");
    let request = MultipartBody::new()
        .json("product", &product)
        .file("images", "front.jpg", b"front")
        .into_request(Method::POST, "/api/products");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["field"], "price");
    assert!(catalog.objects.is_empty().await);
}

#[tokio::test]
async fn test_numeric_price_accepted() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;

    let mut product = draft_json(watches.id, "Royal Oak");
    product["price"] = json!(125_000);
    let request = MultipartBody::new()
        .json("product", &product)
        .file("images", "front.jpg", b"front")
        .into_request(Method::POST, "/api/products");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["price"], "125000");

    product["price"] = json!(-5);
    let request = MultipartBody::new()
        .json("product", &product)
        .file("images", "front.jpg", b"front")
        .into_request(Method::POST, "/api/products");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["field"], "price");
    // Only the first submission's image
    assert_eq!(catalog.objects.len().await, 1);
}

#[tokio::test]
async fn test_missing_product_part_is_bad_request() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();

    let request = MultipartBody::new()
        .file("images", "front.jpg", b"front")
        .into_request(Method::POST, "/api/products");
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_failure_is_bad_gateway() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;
    catalog.objects.fail_puts_after(0).await;

    let request = MultipartBody::new()
        .json("product", &draft_json(watches.id, "Royal Oak"))
        .file("images", "front.jpg", b"front")
        .into_request(Method::POST, "/api/products");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        json_body(response).await["error"],
        "Image upload failed, please retry"
    );
    assert!(catalog.admin.products().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_keeps_retained_then_appends_new() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;
    let product = catalog.seed_product(watches.id, "Royal Oak", 2).await;

    let mut edit = draft_json(watches.id, "Royal Oak Jumbo");
    edit["image_paths"] = json!([product.image_paths[1]]);
    let request = MultipartBody::new()
        .json("product", &edit)
        .file("images", "side.webp", b"side")
        .into_request(Method::PUT, &format!("/api/products/{}", product.id));
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_body(response).await;
    assert_eq!(updated["name"], "Royal Oak Jumbo");
    let images = updated["image_paths"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0], json!(product.image_paths[1]));
    assert!(images[1].as_str().unwrap().ends_with(".webp"));
    // The dropped image was reclaimed
    assert_eq!(catalog.objects.len().await, 2);
}

#[tokio::test]
async fn test_update_unknown_product_not_found() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;
    catalog.seed_product(watches.id, "Royal Oak", 1).await;
    let before = catalog.admin.products().await.unwrap();

    let request = MultipartBody::new()
        .json("product", &draft_json(watches.id, "Ghost"))
        .file("images", "front.jpg", b"front")
        .into_request(Method::PUT, &format!("/api/products/{}", uuid::Uuid::new_v4()));
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(catalog.admin.products().await.unwrap(), before);
    assert_eq!(catalog.objects.len().await, 1);
}

#[tokio::test]
async fn test_show_and_delete_product() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;
    let product = catalog.seed_product(watches.id, "Royal Oak", 2).await;
    let uri = format!("/api/products/{}", product.id);

    let response = send(&router, authorized(Method::GET, &uri).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["name"], "Royal Oak");

    let response = send(
        &router,
        authorized(Method::DELETE, &uri).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["released_images"], 2);
    assert!(catalog.objects.is_empty().await);

    let response = send(&router, authorized(Method::GET, &uri).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_write_reaches_storefront_view() {
    let catalog = TestCatalog::new();
    let router = catalog.admin_router();
    let watches = catalog.seed_category("Wrist Watches").await;
    // Prime the storefront cache
    assert!(catalog.storefront.products().await.unwrap().is_empty());

    let request = MultipartBody::new()
        .json("product", &draft_json(watches.id, "Royal Oak"))
        .file("images", "front.jpg", b"front")
        .into_request(Method::POST, "/api/products");
    assert_eq!(send(&router, request).await.status(), StatusCode::CREATED);

    assert!(
        eventually(|| async { catalog.storefront.products().await.unwrap().len() == 1 }).await
    );
}
