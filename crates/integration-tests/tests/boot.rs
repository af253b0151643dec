//! Integration tests for persisted state and the boot sequence.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use orebi_core::{ProductId, UserId};
use orebi_integration_tests::{
    FakeBackend, TEST_TOKEN, fresh_storefront, raw_product, session, storefront, test_config,
};
use orebi_storefront::Error;
use orebi_storefront::cart::CartLine;
use orebi_storefront::persist::{FileStorage, MemoryStorage, PersistedState, StateStorage};
use orebi_storefront::session::{Session, UserProfile};
use rust_decimal::Decimal;
use secrecy::SecretString;

/// Unsigned JWT carrying only an `exp` claim.
fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
    format!("{header}.{payload}.signature")
}

/// Raw persisted JSON holding `session` and `cart`.
fn persisted(session: &Session, cart: Vec<CartLine>) -> String {
    let seed = MemoryStorage::new();
    seed.save(&PersistedState {
        login: Some(session.into()),
        cart,
        ..PersistedState::default()
    })
    .unwrap();
    seed.raw().unwrap()
}

fn backend() -> Arc<FakeBackend> {
    let backend = FakeBackend::with_products([
        raw_product("p1", "Shirt", Decimal::from(100)),
        raw_product("p2", "Hat", Decimal::from(50)),
    ]);
    backend.seed_cart(&UserId::new("42"), &[("p1", 2), ("p2", 1)]);
    Arc::new(backend)
}

fn profile() -> UserProfile {
    UserProfile {
        id: UserId::new("42"),
        username: "ada".to_string(),
        roles: Vec::new(),
    }
}

#[tokio::test]
async fn test_login_and_cart_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend();
    let path = dir.path().join("state.json");

    {
        let shop = storefront(
            &backend,
            test_config(Duration::ZERO),
            Box::new(FileStorage::new(path.clone())),
        )
        .unwrap();
        let session = session("42");
        shop.sign_in(session.clone()).unwrap();
        shop.cart()
            .fetch_cart(session.user_id(), &session.token)
            .await
            .unwrap();
        shop.persist().unwrap();
    }

    let shop = storefront(
        &backend,
        test_config(Duration::ZERO),
        Box::new(FileStorage::new(path)),
    )
    .unwrap();

    let session = shop.require_session().unwrap();
    assert_eq!(session.user_id(), &UserId::new("42"));
    let snapshot = shop.cart().snapshot();
    assert_eq!(snapshot.lines.len(), 2);
    assert_eq!(snapshot.subtotal, Decimal::from(250));
    assert_eq!(snapshot.grand_total(), Decimal::from(275));
}

#[tokio::test]
async fn test_expired_login_is_dropped_with_its_cart() {
    let backend = backend();
    let live = fresh_storefront(&backend).unwrap();
    let current = session("42");
    let lines = live
        .cart()
        .fetch_cart(current.user_id(), &current.token)
        .await
        .unwrap()
        .lines;
    assert_eq!(lines.len(), 2);

    let mut stale = Session::new(SecretString::from(jwt_with_exp(1_000_000_000)), profile());
    stale.permissions = vec!["ORDER".to_string()];
    let storage = MemoryStorage::with_raw(persisted(&stale, lines));

    let shop = storefront(&backend, test_config(Duration::ZERO), Box::new(storage)).unwrap();

    assert!(shop.session().is_none());
    assert!(matches!(shop.require_session(), Err(Error::Unauthenticated)));
    assert!(shop.cart().snapshot().is_empty());
}

#[test]
fn test_fresh_jwt_login_is_restored() {
    let backend = backend();
    let session = Session::new(SecretString::from(jwt_with_exp(4_102_444_800)), profile());

    let shop = storefront(
        &backend,
        test_config(Duration::ZERO),
        Box::new(MemoryStorage::with_raw(persisted(&session, Vec::new()))),
    )
    .unwrap();

    assert_eq!(shop.session().unwrap().user.username, "ada");
}

#[test]
fn test_foreign_state_is_ignored() {
    let backend = backend();
    let raw = format!(
        r#"{{"key":"orebi","version":99,"login":{{"token":"{TEST_TOKEN}","user":{{"id":"42","username":"ada"}}}},"cart":[]}}"#
    );

    let shop = storefront(
        &backend,
        test_config(Duration::ZERO),
        Box::new(MemoryStorage::with_raw(raw)),
    )
    .unwrap();

    assert!(shop.session().is_none());
}

#[test]
fn test_unreadable_state_is_discarded() {
    let backend = backend();

    let shop = storefront(
        &backend,
        test_config(Duration::ZERO),
        Box::new(MemoryStorage::with_raw("{not json")),
    )
    .unwrap();

    assert!(shop.session().is_none());
    assert!(shop.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_sign_out_forgets_user_state() {
    let backend = backend();
    let shop = fresh_storefront(&backend).unwrap();
    let session = session("42");
    shop.sign_in(session.clone()).unwrap();
    shop.cart()
        .fetch_cart(session.user_id(), &session.token)
        .await
        .unwrap();
    assert!(!shop.cart().snapshot().is_empty());

    shop.sign_out().unwrap();

    assert!(shop.session().is_none());
    assert!(shop.cart().snapshot().is_empty());
    assert!(shop.orders().current_order().is_none());
    // The server cart is untouched
    assert_eq!(backend.cart_items(&UserId::new("42")).unwrap().len(), 2);
}

#[tokio::test]
async fn test_switching_user_drops_previous_cart() {
    let backend = backend();
    let shop = fresh_storefront(&backend).unwrap();
    let first = session("42");
    shop.sign_in(first.clone()).unwrap();
    shop.cart()
        .fetch_cart(first.user_id(), &first.token)
        .await
        .unwrap();

    shop.sign_in(session("7")).unwrap();

    assert!(shop.cart().snapshot().is_empty());
    assert_eq!(shop.require_session().unwrap().user_id(), &UserId::new("7"));
}

#[test]
fn test_persisted_cart_with_unrepresentable_total_is_discarded() {
    let backend = backend();
    let session = Session::new(SecretString::from(jwt_with_exp(4_102_444_800)), profile());
    let mut line = CartLine::placeholder(
        ProductId::new("huge"),
        None,
        Some("Yacht".to_string()),
        2,
        String::new(),
    );
    line.price = Decimal::MAX;
    line.error = None;

    let shop = storefront(
        &backend,
        test_config(Duration::ZERO),
        Box::new(MemoryStorage::with_raw(persisted(&session, vec![line]))),
    )
    .unwrap();

    assert!(shop.session().is_some());
    let state = shop.cart().state();
    assert!(state.snapshot.is_empty());
    assert!(state.error.is_some());
}
