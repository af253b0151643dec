//! Backend REST API access.
//!
//! # Architecture
//!
//! - [`CommerceApi`] is the seam between the stores and the backend
//! - [`HttpApi`] implements it over `reqwest` with bearer-token auth
//! - Responses are decoded into the wire types in [`types`]; product records
//!   stay raw here and are normalized once by the catalog client
//!
//! # Example
//!
//! ```rust,ignore
//! use orebi_storefront::api::{CommerceApi, HttpApi};
//!
//! let api = HttpApi::new(&config)?;
//! let categories = api.get_categories().await?;
//! ```

mod http;
pub mod types;

pub use http::HttpApi;
pub use types::*;

use orebi_core::{OrderId, ProductId, UserId};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (DNS, connection refused, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Backend returned a non-success status.
    #[error("HTTP error! status: {status}, message: {message}")]
    Http { status: u16, message: String },

    /// The user's cart does not exist on the backend.
    #[error("Cart not found for user {0}")]
    NotFound(UserId),

    /// Backend rejected the credentials (401/403).
    #[error("Not authorized (status {status}): {message}")]
    Authorization { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Authorization { status, .. } => Some(*status),
            Self::Network(_) | Self::NotFound(_) | Self::Decode(_) => None,
        }
    }

    /// Whether the backend rejected the caller's credentials.
    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization { .. })
    }

    /// Map a cart read/add failure to [`ApiError::NotFound`] when the backend
    /// signals a missing cart (400 or 404).
    #[must_use]
    pub fn cart_not_found(self, user_id: &UserId) -> Self {
        match self {
            Self::Http { status: 400 | 404, .. } => Self::NotFound(user_id.clone()),
            other => other,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Operations offered by the storefront backend.
///
/// Product endpoints are public; everything else carries the session's
/// bearer token.
pub trait CommerceApi: Send + Sync {
    // Catalog

    /// `GET /api/products` with optional query parameters.
    async fn get_products(&self, query: &ProductQuery) -> Result<Vec<RawProduct>, ApiError>;

    /// `GET /api/products/{id}`.
    async fn get_product(&self, id: &ProductId) -> Result<RawProduct, ApiError>;

    /// `GET /api/categories`.
    async fn get_categories(&self) -> Result<Vec<Category>, ApiError>;

    /// `GET /api/tags`.
    async fn get_tags(&self) -> Result<Vec<Tag>, ApiError>;

    // Cart

    /// `GET /api/cart/{userId}`. A missing cart is [`ApiError::NotFound`].
    async fn get_cart(&self, user: &UserId, token: &SecretString)
    -> Result<CartRecord, ApiError>;

    /// `POST /api/cart` with an empty item list.
    async fn create_cart(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<CartRecord, ApiError>;

    /// `POST /api/cart/{userId}/items`. A missing cart is [`ApiError::NotFound`].
    async fn add_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<AddItemResponse, ApiError>;

    /// `PUT /api/cart/{userId}/items/{itemId}`.
    async fn update_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// `DELETE /api/cart/{userId}/items/{itemId}`.
    async fn remove_cart_item(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
    ) -> Result<(), ApiError>;

    /// `DELETE /api/cart/{userId}`.
    async fn delete_cart(&self, user: &UserId, token: &SecretString) -> Result<(), ApiError>;

    /// `POST /api/cart/{userId}/coupon`.
    async fn apply_coupon(
        &self,
        user: &UserId,
        token: &SecretString,
        code: &str,
    ) -> Result<CouponResponse, ApiError>;

    // Orders

    /// `POST /api/orders/place/{userId}`.
    async fn place_order(
        &self,
        user: &UserId,
        token: &SecretString,
        request: &PlaceOrderRequest,
    ) -> Result<OrderRecord, ApiError>;

    /// `GET /api/orders/{orderId}/user/{userId}`.
    async fn get_order(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
    ) -> Result<OrderRecord, ApiError>;

    /// `GET /api/orders/user/{userId}`.
    async fn get_user_orders(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<Vec<OrderRecord>, ApiError>;

    // Payments

    /// `POST /api/payments/initiate/{orderId}?userId=`.
    async fn initiate_payment(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
        customer: &CustomerDetails,
    ) -> Result<PaymentSession, ApiError>;

    /// `GET /api/payments/status/{orderId}?userId=`.
    async fn get_payment_status(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
    ) -> Result<PaymentStatusRecord, ApiError>;
}
