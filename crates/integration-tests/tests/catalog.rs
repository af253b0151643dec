//! Integration tests for the catalog client, catalog store and filters.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use orebi_core::{CategoryId, OperationStatus, ProductId, TagId};
use orebi_integration_tests::{FakeBackend, op, raw_product, storefront, test_config};
use orebi_storefront::api::{ApiError, RawProduct};
use orebi_storefront::catalog::{ListingKind, UNNAMED_PRODUCT};
use orebi_storefront::persist::MemoryStorage;
use rust_decimal::Decimal;
use serde_json::json;

fn catalog_backend() -> Arc<FakeBackend> {
    let mut shirt = raw_product("p1", "Linen Shirt", Decimal::from(120));
    shirt.category_ids = Some(vec![CategoryId::new("c1")]);
    shirt.tag_ids = Some(vec![TagId::new("summer")]);

    let mut hat = raw_product("p2", "Straw Hat", Decimal::from(40));
    hat.category_ids = Some(vec![CategoryId::new("c2")]);
    hat.discount = Some(json!(15));

    let legacy: RawProduct = serde_json::from_value(json!({
        "_id": "p3",
        "productName": "Shirt",
        "price": "19.99"
    }))
    .unwrap();

    let backend = FakeBackend::with_products([shirt, hat, legacy]);
    backend.add_category("c1", "Shirts");
    backend.add_category("c2", "Hats");
    backend.add_tag("summer", "Summer");
    Arc::new(backend)
}

fn shop(
    backend: &Arc<FakeBackend>,
    cache_ttl: Duration,
) -> orebi_storefront::Storefront<FakeBackend> {
    storefront(
        backend,
        test_config(cache_ttl),
        Box::new(MemoryStorage::new()),
    )
    .unwrap()
}

// =============================================================================
// Normalization at the boundary
// =============================================================================

#[tokio::test]
async fn test_legacy_record_is_normalized() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::ZERO);

    let product = shop
        .catalog()
        .load_product(&ProductId::new("p3"))
        .await
        .unwrap();

    assert_eq!(product.name, "Shirt");
    assert_eq!(product.product_name, "Shirt");
    assert_eq!(product.price, Decimal::new(1999, 2));
}

#[tokio::test]
async fn test_sparse_record_gets_defaults() {
    let backend = catalog_backend();
    backend.add_product(RawProduct {
        id: Some(ProductId::new("p4")),
        ..RawProduct::default()
    });
    let shop = shop(&backend, Duration::ZERO);

    let products = shop.catalog().load_listing(ListingKind::All).await.unwrap();

    assert_eq!(products.len(), 4);
    let unnamed = products
        .iter()
        .find(|p| p.id == ProductId::new("p4"))
        .unwrap();
    assert_eq!(unnamed.name, UNNAMED_PRODUCT);
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_listing_is_cached_within_ttl() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::from_secs(300));
    let client = shop.catalog().client();

    let first = client.fetch_all_products().await.unwrap();
    let second = client.fetch_all_products().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.calls(op::GET_PRODUCTS), 1);

    client.invalidate();
    client.fetch_all_products().await.unwrap();
    assert_eq!(backend.calls(op::GET_PRODUCTS), 2);
}

#[tokio::test]
async fn test_zero_ttl_disables_cache() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::ZERO);
    let client = shop.catalog().client();

    client.fetch_categories().await.unwrap();
    client.fetch_categories().await.unwrap();

    assert_eq!(backend.calls(op::GET_CATEGORIES), 2);
}

#[tokio::test]
async fn test_product_detail_is_cached() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::from_secs(300));
    let client = shop.catalog().client();

    client.fetch_product(&ProductId::new("p1")).await.unwrap();
    client.fetch_product(&ProductId::new("p1")).await.unwrap();
    client.fetch_product(&ProductId::new("p2")).await.unwrap();

    assert_eq!(backend.calls(op::GET_PRODUCT), 2);
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::from_secs(300));
    let client = shop.catalog().client();

    backend.fail_next(op::GET_TAGS, ApiError::Network("timeout".to_string()));
    assert!(client.fetch_tags().await.is_err());

    let tags = client.fetch_tags().await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(backend.calls(op::GET_TAGS), 2);
}

// =============================================================================
// Listings and filters
// =============================================================================

#[tokio::test]
async fn test_fixed_listings_send_their_flags() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::ZERO);

    shop.catalog()
        .load_listing(ListingKind::NewArrivals)
        .await
        .unwrap();
    let offers = shop
        .catalog()
        .load_listing(ListingKind::SpecialOffers)
        .await
        .unwrap();
    shop.catalog()
        .load_listing(ListingKind::BestSellers)
        .await
        .unwrap();

    let queries = backend.product_queries();
    assert_eq!(queries.len(), 3);
    assert_eq!(
        queries.first().unwrap().period.as_deref(),
        Some("week")
    );
    assert!(queries.iter().any(|q| q.special_offers));
    assert!(queries.last().unwrap().bestsellers);

    assert_eq!(offers.len(), 1);
    let state = shop.catalog().state();
    assert_eq!(state.special_offers, offers);
    assert_eq!(state.status, OperationStatus::Succeeded);
}

#[tokio::test]
async fn test_filtered_products_follow_selection() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::from_secs(300));

    let selection = {
        let mut filters = shop.filters();
        filters.toggle_category(CategoryId::new("c1"));
        filters.toggle_category(CategoryId::new("c2"));
        let range = filters
            .add_price_range(Decimal::from(50), Decimal::from(150))
            .unwrap();
        filters.toggle_price_range_selection(range.id);
        filters.clone()
    };

    let products = shop.catalog().load_filtered(&selection).await.unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products.first().unwrap().id, ProductId::new("p1"));

    let query = backend.product_queries().pop().unwrap();
    assert_eq!(query.category_ids.len(), 2);
    assert_eq!(query.min_price, Some(Decimal::from(50)));
    assert_eq!(query.max_price, Some(Decimal::from(150)));

    // Filtered queries always hit the backend
    shop.catalog().load_filtered(&selection).await.unwrap();
    assert_eq!(backend.calls(op::GET_PRODUCTS), 2);
}

#[tokio::test]
async fn test_invalid_price_range_leaves_filters_unchanged() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::ZERO);
    let mut filters = shop.filters();

    assert!(filters.add_price_range(Decimal::from(50), Decimal::from(10)).is_err());
    assert!(filters.price_ranges().is_empty());
}

#[tokio::test]
async fn test_search_prefers_filtered_listing() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::ZERO);
    let catalog = shop.catalog();

    catalog.load_listing(ListingKind::All).await.unwrap();
    assert_eq!(catalog.search("shirt").len(), 2);

    let mut selection = shop.filters().clone();
    selection.toggle_category(CategoryId::new("c2"));
    catalog.load_filtered(&selection).await.unwrap();

    assert!(catalog.search("shirt").is_empty());
    assert_eq!(catalog.search("STRAW").len(), 1);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_catalog_error_auto_dismisses() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::ZERO);
    let catalog = shop.catalog();

    backend.fail_next(
        op::GET_PRODUCTS,
        ApiError::Http {
            status: 500,
            message: "Internal Server Error".to_string(),
        },
    );
    let before = Instant::now();
    assert!(catalog.load_listing(ListingKind::All).await.is_err());

    let message = catalog.error_at(before).unwrap();
    assert!(message.contains("status: 500"));
    assert_eq!(catalog.state().status, OperationStatus::Failed);

    let later = Instant::now() + shop.config().error_dismiss_after;
    assert!(catalog.error_at(later).is_none());
    assert!(catalog.error().is_none());
}

#[tokio::test]
async fn test_catalog_error_can_be_cleared() {
    let backend = catalog_backend();
    let shop = shop(&backend, Duration::ZERO);

    backend.fail_next(op::GET_CATEGORIES, ApiError::Network("offline".to_string()));
    assert!(shop.catalog().load_categories().await.is_err());
    assert!(shop.catalog().error().is_some());

    shop.catalog().clear_error();
    assert!(shop.catalog().error().is_none());
}
