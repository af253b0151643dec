//! Wire types for the backend REST API.
//!
//! Inbound amounts are decoded leniently (number, numeric string or `null`);
//! outbound amounts are sent as JSON numbers.

use chrono::{DateTime, NaiveDateTime, Utc};
use orebi_core::{
    CartItemId, CategoryId, OrderId, PaymentStatus, ProductId, TagId, UserId, format_amount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Catalog
// =============================================================================

/// Product record exactly as the backend returns it.
///
/// Different endpoints use different shapes (`name` vs `productName`, `id` vs
/// `_id`, numeric vs string price). Nothing outside the catalog client should
/// read these fields; see [`crate::catalog::Product`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    pub id: Option<ProductId>,
    #[serde(rename = "_id")]
    pub document_id: Option<ProductId>,
    pub name: Option<String>,
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub des: Option<String>,
    pub img: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub price: Option<serde_json::Value>,
    pub color: Option<String>,
    pub discount: Option<serde_json::Value>,
    pub available_quantity: Option<serde_json::Value>,
    pub sku: Option<String>,
    pub category_ids: Option<Vec<CategoryId>>,
    pub tag_ids: Option<Vec<TagId>>,
}

/// Product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Product tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    #[serde(default)]
    pub name: String,
}

/// Query parameters for `GET /api/products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category_ids: Vec<CategoryId>,
    pub tag_ids: Vec<TagId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub period: Option<String>,
    pub special_offers: bool,
    pub bestsellers: bool,
}

impl ProductQuery {
    /// Products added during the last week.
    #[must_use]
    pub fn new_arrivals() -> Self {
        Self {
            period: Some("week".to_string()),
            ..Self::default()
        }
    }

    /// Products currently on special offer.
    #[must_use]
    pub fn special_offers() -> Self {
        Self {
            special_offers: true,
            ..Self::default()
        }
    }

    /// Best-selling products.
    #[must_use]
    pub fn best_sellers() -> Self {
        Self {
            bestsellers: true,
            ..Self::default()
        }
    }

    /// Query-string pairs; empty parameters are omitted.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if !self.category_ids.is_empty() {
            let ids: Vec<&str> = self.category_ids.iter().map(CategoryId::as_str).collect();
            pairs.push(("categoryIds", ids.join(",")));
        }
        if !self.tag_ids.is_empty() {
            let ids: Vec<&str> = self.tag_ids.iter().map(TagId::as_str).collect();
            pairs.push(("tagIds", ids.join(",")));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", format_amount(min)));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", format_amount(max)));
        }
        if let Some(period) = &self.period {
            pairs.push(("period", period.clone()));
        }
        if self.special_offers {
            pairs.push(("specialOffers", "true".to_string()));
        }
        if self.bestsellers {
            pairs.push(("bestsellers", "true".to_string()));
        }

        pairs
    }

    /// Whether the query narrows by category, tag or price.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.category_ids.is_empty()
            || !self.tag_ids.is_empty()
            || self.min_price.is_some()
            || self.max_price.is_some()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Server cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub items: Vec<CartItemRecord>,
}

/// One item of the server cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRecord {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub product_name: Option<String>,
}

/// Response of `POST /api/cart/{userId}/items`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemResponse {
    #[serde(default, alias = "id")]
    pub item_id: Option<CartItemId>,
}

/// Response of `POST /api/cart/{userId}/coupon`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouponResponse {
    #[serde(default)]
    pub coupon: Option<String>,
    #[serde(default, deserialize_with = "orebi_core::price::lenient::deserialize")]
    pub discount: Decimal,
}

// =============================================================================
// Orders
// =============================================================================

/// Body of `POST /api/orders/place/{userId}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_charge: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub applied_coupon: String,
}

/// Line item of a placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Order as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemRecord>,
    #[serde(default, deserialize_with = "orebi_core::price::lenient::deserialize")]
    pub total_amount: Decimal,
    #[serde(default, deserialize_with = "orebi_core::price::lenient::deserialize")]
    pub shipping_charge: Decimal,
    #[serde(default, deserialize_with = "orebi_core::price::lenient::deserialize")]
    pub discount: Decimal,
    #[serde(default)]
    pub applied_coupon: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
}

impl OrderRecord {
    /// Creation timestamp, accepting RFC 3339 or a zone-less local timestamp
    /// (read as UTC).
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }
}

/// Line item of an order as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRecord {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: u32,
    #[serde(default, deserialize_with = "orebi_core::price::lenient::deserialize")]
    pub price: Decimal,
}

// =============================================================================
// Payments
// =============================================================================

/// Customer details sent when initiating a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

/// Parameters for the external payment widget, signed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    #[serde(default)]
    pub sandbox: bool,
    pub merchant_id: String,
    #[serde(default)]
    pub return_url: String,
    #[serde(default)]
    pub cancel_url: String,
    #[serde(default)]
    pub notify_url: String,
    pub order_id: OrderId,
    #[serde(default)]
    pub items: String,
    #[serde(default, deserialize_with = "orebi_core::price::lenient::deserialize")]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub hash: String,
}

/// Response of `GET /api/payments/status/{orderId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRecord {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default, alias = "paymentStatus")]
    pub status: PaymentStatus,
    #[serde(default)]
    pub message: Option<String>,
}
