//! Live tests against a running server and database.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied (`po-cli migrate`),
//!   reachable through `DATABASE_URL`
//! - For the server tests, the admin server running
//!   (`cargo run -p product-optimizer-admin`) with `SHOPIFY_API_KEY` and
//!   `SHOPIFY_API_SECRET` matching the test constants
//!
//! Run with: cargo test -p product-optimizer-integration-tests -- --ignored

use axum::body::Body;
use axum::http::{Request, header};
use http_body_util::BodyExt;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use product_optimizer_admin::db::{NewProductVersion, ProductVersionRepository, ShopUserRepository};
use product_optimizer_core::{Score, VersionStatus};
use product_optimizer_integration_tests::{session_token, test_app, test_pool, unique_shop};

/// Base URL for the running app (configurable via environment).
fn base_url() -> String {
    std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_live_readiness() {
    let response = Client::new()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to reach server");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_live_api_requires_session_token() {
    let response = Client::new()
        .get(format!("{}/api/tokens", base_url()))
        .send()
        .await
        .expect("Failed to reach server");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get("x-shopify-retry-invalid-session-request")
            .and_then(|v| v.to_str().ok()),
        Some("1")
    );
}

// ============================================================================
// Database-backed behaviour
// ============================================================================

#[tokio::test]
#[ignore = "requires a migrated database"]
async fn test_live_exhausted_balance_returns_402() {
    let pool = test_pool().await;
    let shop = unique_shop("live-tokens");
    let users = ShopUserRepository::new(&pool);

    users.grant_tokens(&shop, 2).await.unwrap();
    assert_eq!(users.consume_token(&shop).await.unwrap(), Some(1));
    assert_eq!(users.consume_token(&shop).await.unwrap(), Some(0));
    assert_eq!(users.consume_token(&shop).await.unwrap(), None);
    assert_eq!(users.token_balance(&shop).await.unwrap(), 0);

    let response = test_app()
        .oneshot(
            Request::post("/api/optimize-product")
                .header(header::AUTHORIZATION, format!("Bearer {}", session_token(&shop)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "prompt": "שפר את המוצר", "fields": ["title"] }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::PAYMENT_REQUIRED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert_eq!(body["tokens"], 0);
    assert_eq!(users.token_balance(&shop).await.unwrap(), 0);

    users.delete_shop_data(&shop).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a migrated database"]
async fn test_live_current_version_is_latest_current_row() {
    let pool = test_pool().await;
    let shop = unique_shop("live-versions");
    let product_id = "gid://shopify/Product/4242";
    let versions = ProductVersionRepository::new(&pool);

    let append = |title: &'static str, status: VersionStatus| NewProductVersion {
        product_id: product_id.to_string(),
        title: title.to_string(),
        description: String::new(),
        tags: vec!["tent".to_string()],
        score: Score::new(60),
        status,
    };

    assert!(versions.current_for_product(&shop, product_id).await.unwrap().is_none());

    versions.create(&shop, &append("Original", VersionStatus::Original)).await.unwrap();
    let current = versions
        .create(&shop, &append("Approved", VersionStatus::Current))
        .await
        .unwrap();
    versions.create(&shop, &append("Proposal", VersionStatus::Proposed)).await.unwrap();

    let found = versions.current_for_product(&shop, product_id).await.unwrap().unwrap();
    assert_eq!(found.id, current.id);
    assert_eq!(found.title, "Approved");

    let listed = versions.list_for_product(&shop, product_id).await.unwrap();
    let statuses: Vec<VersionStatus> = listed.iter().map(|v| v.status).collect();
    assert_eq!(
        statuses,
        vec![VersionStatus::Original, VersionStatus::Current, VersionStatus::Proposed]
    );

    let newer = versions
        .create(&shop, &append("Approved again", VersionStatus::Current))
        .await
        .unwrap();
    let found = versions.current_for_product(&shop, product_id).await.unwrap().unwrap();
    assert_eq!(found.id, newer.id);

    let other_shop = unique_shop("live-versions-other");
    assert!(versions.current_for_product(&other_shop, product_id).await.unwrap().is_none());

    ShopUserRepository::new(&pool).delete_shop_data(&shop).await.unwrap();
}
