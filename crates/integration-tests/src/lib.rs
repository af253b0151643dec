//! Integration tests for the Orebi storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orebi-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - cart store against the fake backend
//! - `catalog` - normalization, caching and filtering
//! - `checkout_flow` - order, payment and widget outcomes
//! - `boot` - persisted login and cart restore
//!
//! Every test drives the real stores against [`FakeBackend`], an in-memory
//! implementation of [`CommerceApi`] with call counters and one-shot failure
//! injection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use orebi_core::{CartItemId, OrderId, PaymentStatus, ProductId, UserId};
use orebi_storefront::api::{
    AddItemResponse, ApiError, CartItemRecord, CartRecord, Category, CommerceApi, CouponResponse,
    CustomerDetails, OrderItemRecord, OrderRecord, PaymentSession, PaymentStatusRecord,
    PlaceOrderRequest, ProductQuery, RawProduct, Tag,
};
use orebi_storefront::persist::{MemoryStorage, StateStorage};
use orebi_storefront::session::{Session, UserProfile};
use orebi_storefront::{ClientConfig, Storefront};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;

/// Token accepted by the fake backend.
pub const TEST_TOKEN: &str = "test-token";

/// Backend operation names, used for call counting and failure injection.
pub mod op {
    pub const GET_PRODUCTS: &str = "get_products";
    pub const GET_PRODUCT: &str = "get_product";
    pub const GET_CATEGORIES: &str = "get_categories";
    pub const GET_TAGS: &str = "get_tags";
    pub const GET_CART: &str = "get_cart";
    pub const CREATE_CART: &str = "create_cart";
    pub const ADD_CART_ITEM: &str = "add_cart_item";
    pub const UPDATE_CART_ITEM: &str = "update_cart_item";
    pub const REMOVE_CART_ITEM: &str = "remove_cart_item";
    pub const DELETE_CART: &str = "delete_cart";
    pub const APPLY_COUPON: &str = "apply_coupon";
    pub const PLACE_ORDER: &str = "place_order";
    pub const GET_ORDER: &str = "get_order";
    pub const GET_USER_ORDERS: &str = "get_user_orders";
    pub const INITIATE_PAYMENT: &str = "initiate_payment";
    pub const GET_PAYMENT_STATUS: &str = "get_payment_status";
}

/// Raw product record in the backend's preferred shape.
#[must_use]
pub fn raw_product(id: &str, name: &str, price: Decimal) -> RawProduct {
    RawProduct {
        id: Some(ProductId::new(id)),
        name: Some(name.to_string()),
        description: Some(format!("{name} description")),
        price: Some(json!(price.to_string())),
        color: Some("Blue".to_string()),
        ..RawProduct::default()
    }
}

#[derive(Default)]
struct FakeState {
    products: BTreeMap<ProductId, RawProduct>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    carts: HashMap<UserId, Vec<CartItemRecord>>,
    coupons: HashMap<String, Decimal>,
    orders: Vec<(UserId, OrderRecord)>,
    placed: Vec<PlaceOrderRequest>,
    broken_products: HashSet<ProductId>,
    failures: HashMap<&'static str, Vec<ApiError>>,
    calls: HashMap<&'static str, usize>,
    queries: Vec<ProductQuery>,
    interleaved: HashSet<&'static str>,
    next_id: u64,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory commerce backend.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend serving `products`.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = RawProduct>) -> Self {
        let backend = Self::new();
        for product in products {
            backend.add_product(product);
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and return the next injected failure, if any.
    fn enter(&self, op: &'static str, token: Option<&SecretString>) -> Result<(), ApiError> {
        use secrecy::ExposeSecret;

        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        if let Some(err) = state.failures.get_mut(op).and_then(Vec::pop) {
            return Err(err);
        }
        if token.is_some_and(|token| token.expose_secret() != TEST_TOKEN) {
            return Err(ApiError::Authorization {
                status: 401,
                message: "Invalid token".to_string(),
            });
        }
        Ok(())
    }

    pub fn add_product(&self, product: RawProduct) {
        if let Some(id) = product.id.clone().or_else(|| product.document_id.clone()) {
            self.lock().products.insert(id, product);
        }
    }

    pub fn add_category(&self, id: &str, name: &str) {
        self.lock().categories.push(Category {
            id: id.into(),
            name: name.to_string(),
            description: None,
        });
    }

    pub fn add_tag(&self, id: &str, name: &str) {
        self.lock().tags.push(Tag {
            id: id.into(),
            name: name.to_string(),
        });
    }

    pub fn add_coupon(&self, code: &str, discount: Decimal) {
        self.lock().coupons.insert(code.to_string(), discount);
    }

    /// Make `GET /api/products/{id}` fail for this product.
    pub fn break_product(&self, id: &str) {
        self.lock().broken_products.insert(ProductId::new(id));
    }

    /// Fail the next call of `op` with `err`. Failures queue up.
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.lock().failures.entry(op).or_default().insert(0, err);
    }

    /// Yield to the scheduler inside `op` between reading the cart and
    /// answering, so overlapping calls see each other's stale reads.
    pub fn interleave(&self, op: &'static str) {
        self.lock().interleaved.insert(op);
    }

    async fn pause(&self, op: &'static str) {
        let interleaved = self.lock().interleaved.contains(op);
        if interleaved {
            tokio::task::yield_now().await;
        }
    }

    /// Number of calls made to `op`.
    #[must_use]
    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or_default()
    }

    /// Seed the server cart of `user` with `(product id, quantity)` pairs.
    pub fn seed_cart(&self, user: &UserId, items: &[(&str, u32)]) {
        let mut state = self.lock();
        let records = items
            .iter()
            .map(|(product_id, quantity)| CartItemRecord {
                id: CartItemId::new(state.next_id("item")),
                product_id: ProductId::new(*product_id),
                quantity: *quantity,
                product_name: None,
            })
            .collect();
        state.carts.insert(user.clone(), records);
    }

    /// Server cart items of `user`; `None` when no cart exists.
    #[must_use]
    pub fn cart_items(&self, user: &UserId) -> Option<Vec<CartItemRecord>> {
        self.lock().carts.get(user).cloned()
    }

    /// Every order placement request received.
    #[must_use]
    pub fn placed_orders(&self) -> Vec<PlaceOrderRequest> {
        self.lock().placed.clone()
    }

    /// Every product query received.
    #[must_use]
    pub fn product_queries(&self) -> Vec<ProductQuery> {
        self.lock().queries.clone()
    }

    pub fn set_payment_status(&self, order_id: &OrderId, status: PaymentStatus) {
        let mut state = self.lock();
        for (_, order) in &mut state.orders {
            if &order.id == order_id {
                order.payment_status = status.clone();
            }
        }
    }

    fn find_order(&self, order_id: &OrderId, user: &UserId) -> Result<OrderRecord, ApiError> {
        self.lock()
            .orders
            .iter()
            .find(|(owner, order)| owner == user && &order.id == order_id)
            .map(|(_, order)| order.clone())
            .ok_or_else(|| ApiError::Http {
                status: 404,
                message: "Order not found".to_string(),
            })
    }
}

fn matches_query(product: &RawProduct, query: &ProductQuery) -> bool {
    let price = product
        .price
        .as_ref()
        .and_then(orebi_core::decimal_from_json)
        .unwrap_or_default();
    let discount = product
        .discount
        .as_ref()
        .and_then(orebi_core::decimal_from_json)
        .unwrap_or_default();
    let categories = product.category_ids.as_deref().unwrap_or_default();
    let tags = product.tag_ids.as_deref().unwrap_or_default();

    (query.category_ids.is_empty() || query.category_ids.iter().any(|c| categories.contains(c)))
        && (query.tag_ids.is_empty() || query.tag_ids.iter().any(|t| tags.contains(t)))
        && query.min_price.is_none_or(|min| price >= min)
        && query.max_price.is_none_or(|max| price <= max)
        && (!query.special_offers || discount > Decimal::ZERO)
}

fn missing_item() -> ApiError {
    ApiError::Http {
        status: 404,
        message: "Cart item not found".to_string(),
    }
}

impl CommerceApi for FakeBackend {
    async fn get_products(&self, query: &ProductQuery) -> Result<Vec<RawProduct>, ApiError> {
        self.enter(op::GET_PRODUCTS, None)?;
        let mut state = self.lock();
        state.queries.push(query.clone());
        Ok(state
            .products
            .values()
            .filter(|product| matches_query(product, query))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: &ProductId) -> Result<RawProduct, ApiError> {
        self.enter(op::GET_PRODUCT, None)?;
        let state = self.lock();
        if state.broken_products.contains(id) {
            return Err(ApiError::Http {
                status: 500,
                message: "Product service unavailable".to_string(),
            });
        }
        state.products.get(id).cloned().ok_or_else(|| ApiError::Http {
            status: 404,
            message: "Product not found".to_string(),
        })
    }

    async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.enter(op::GET_CATEGORIES, None)?;
        Ok(self.lock().categories.clone())
    }

    async fn get_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.enter(op::GET_TAGS, None)?;
        Ok(self.lock().tags.clone())
    }

    async fn get_cart(&self, user: &UserId, token: &SecretString) -> Result<CartRecord, ApiError> {
        self.enter(op::GET_CART, Some(token))?;
        let items = self.lock().carts.get(user).cloned();
        self.pause(op::GET_CART).await;
        items
            .map(|items| CartRecord {
                id: Some(format!("cart-{user}")),
                user_id: Some(user.clone()),
                items,
            })
            .ok_or_else(|| ApiError::NotFound(user.clone()))
    }

    async fn create_cart(&self, user: &UserId, token: &SecretString) -> Result<CartRecord, ApiError> {
        self.enter(op::CREATE_CART, Some(token))?;
        self.lock().carts.entry(user.clone()).or_default();
        Ok(CartRecord {
            id: Some(format!("cart-{user}")),
            user_id: Some(user.clone()),
            items: Vec::new(),
        })
    }

    async fn add_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<AddItemResponse, ApiError> {
        self.enter(op::ADD_CART_ITEM, Some(token))?;
        // Read and write are separate steps, like a backend without row locks
        let existing = self
            .lock()
            .carts
            .get(user)
            .ok_or_else(|| ApiError::NotFound(user.clone()))?
            .iter()
            .find(|item| &item.product_id == product_id)
            .map(|item| (item.id.clone(), item.quantity));
        self.pause(op::ADD_CART_ITEM).await;

        let mut state = self.lock();
        let item_id = CartItemId::new(state.next_id("item"));
        let items = state
            .carts
            .get_mut(user)
            .ok_or_else(|| ApiError::NotFound(user.clone()))?;

        if let Some((id, read_quantity)) = existing {
            if let Some(item) = items.iter_mut().find(|item| item.id == id) {
                item.quantity = read_quantity.saturating_add(quantity);
            }
            return Ok(AddItemResponse { item_id: Some(id) });
        }
        items.push(CartItemRecord {
            id: item_id.clone(),
            product_id: product_id.clone(),
            quantity,
            product_name: None,
        });
        Ok(AddItemResponse {
            item_id: Some(item_id),
        })
    }

    async fn update_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.enter(op::UPDATE_CART_ITEM, Some(token))?;
        let mut state = self.lock();
        let item = state
            .carts
            .get_mut(user)
            .and_then(|items| items.iter_mut().find(|item| item.id.as_str() == item_id))
            .ok_or_else(missing_item)?;
        item.quantity = quantity;
        Ok(())
    }

    async fn remove_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
    ) -> Result<(), ApiError> {
        self.enter(op::REMOVE_CART_ITEM, Some(token))?;
        let mut state = self.lock();
        let items = state.carts.get_mut(user).ok_or_else(missing_item)?;
        let before = items.len();
        items.retain(|item| item.id.as_str() != item_id);
        if items.len() == before {
            return Err(missing_item());
        }
        Ok(())
    }

    async fn delete_cart(&self, user: &UserId, token: &SecretString) -> Result<(), ApiError> {
        self.enter(op::DELETE_CART, Some(token))?;
        self.lock().carts.remove(user);
        Ok(())
    }

    async fn apply_coupon(
        &self,
        _user: &UserId,
        token: &SecretString,
        code: &str,
    ) -> Result<CouponResponse, ApiError> {
        self.enter(op::APPLY_COUPON, Some(token))?;
        self.lock()
            .coupons
            .get(code)
            .map(|discount| CouponResponse {
                coupon: Some(code.to_string()),
                discount: *discount,
            })
            .ok_or_else(|| ApiError::Http {
                status: 400,
                message: "Invalid coupon code".to_string(),
            })
    }

    async fn place_order(
        &self,
        user: &UserId,
        token: &SecretString,
        request: &PlaceOrderRequest,
    ) -> Result<OrderRecord, ApiError> {
        self.enter(op::PLACE_ORDER, Some(token))?;
        let mut state = self.lock();
        let order = OrderRecord {
            id: OrderId::new(state.next_id("order")),
            status: Some("PLACED".to_string()),
            items: request
                .items
                .iter()
                .map(|item| OrderItemRecord {
                    product_id: item.product_id.clone(),
                    product_name: None,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
            total_amount: request.total_amount,
            shipping_charge: request.shipping_charge,
            discount: request.discount,
            applied_coupon: Some(request.applied_coupon.clone()),
            created_at: Some("2026-01-15T10:30:00".to_string()),
            payment_status: PaymentStatus::Pending,
        };
        state.placed.push(request.clone());
        state.orders.push((user.clone(), order.clone()));
        Ok(order)
    }

    async fn get_order(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
    ) -> Result<OrderRecord, ApiError> {
        self.enter(op::GET_ORDER, Some(token))?;
        self.find_order(order_id, user)
    }

    async fn get_user_orders(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<Vec<OrderRecord>, ApiError> {
        self.enter(op::GET_USER_ORDERS, Some(token))?;
        Ok(self
            .lock()
            .orders
            .iter()
            .filter(|(owner, _)| owner == user)
            .map(|(_, order)| order.clone())
            .collect())
    }

    async fn initiate_payment(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
        _customer: &CustomerDetails,
    ) -> Result<PaymentSession, ApiError> {
        self.enter(op::INITIATE_PAYMENT, Some(token))?;
        let order = self.find_order(order_id, user)?;
        Ok(PaymentSession {
            sandbox: true,
            merchant_id: "1211149".to_string(),
            return_url: "https://shop.example.com/payment/success".to_string(),
            cancel_url: "https://shop.example.com/payment/cancel".to_string(),
            notify_url: "https://api.example.com/api/payments/notify".to_string(),
            order_id: order.id.clone(),
            items: format!("Order #{}", order.id),
            amount: order.total_amount + order.shipping_charge,
            currency: "LKR".to_string(),
            hash: "5F1C0E8A".to_string(),
        })
    }

    async fn get_payment_status(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
    ) -> Result<PaymentStatusRecord, ApiError> {
        self.enter(op::GET_PAYMENT_STATUS, Some(token))?;
        let order = self.find_order(order_id, user)?;
        Ok(PaymentStatusRecord {
            order_id: Some(order.id),
            status: order.payment_status,
            message: None,
        })
    }
}

// =============================================================================
// Test context
// =============================================================================

/// Configuration for tests: caching disabled unless a test opts in.
#[must_use]
pub fn test_config(cache_ttl: Duration) -> ClientConfig {
    ClientConfig {
        cache_ttl,
        ..ClientConfig::default()
    }
}

/// Session for `user_id` carrying [`TEST_TOKEN`].
#[must_use]
pub fn session(user_id: &str) -> Session {
    Session::new(
        SecretString::from(TEST_TOKEN),
        UserProfile {
            id: UserId::new(user_id),
            username: format!("user{user_id}"),
            roles: vec!["USER".to_string()],
        },
    )
}

/// Boot a storefront over `backend` with in-memory persistence.
///
/// # Errors
///
/// Returns an error if booting fails.
pub fn storefront(
    backend: &Arc<FakeBackend>,
    config: ClientConfig,
    storage: Box<dyn StateStorage>,
) -> orebi_storefront::Result<Storefront<FakeBackend>> {
    Storefront::boot(config, Arc::clone(backend), storage)
}

/// Boot a storefront with caching disabled and nothing persisted.
///
/// # Errors
///
/// Returns an error if booting fails.
pub fn fresh_storefront(
    backend: &Arc<FakeBackend>,
) -> orebi_storefront::Result<Storefront<FakeBackend>> {
    storefront(
        backend,
        test_config(Duration::ZERO),
        Box::new(MemoryStorage::new()),
    )
}
