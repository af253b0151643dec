//! Normalization of backend product records.
//!
//! Runs exactly once, at the API boundary. Everything downstream reads
//! [`Product`] and never the raw record.

use orebi_core::{CategoryId, ProductId, TagId, decimal_from_json};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::api::RawProduct;

/// Name used when neither name field is present.
pub const UNNAMED_PRODUCT: &str = "Unnamed Product";

/// Description used when neither description field is present.
pub const NO_DESCRIPTION: &str = "No description available";

/// Color label used when the backend omits one.
pub const DEFAULT_COLOR: &str = "Not specified";

/// A product in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Mirror of `name`
    pub product_name: String,
    pub description: String,
    /// Mirror of `description`
    pub des: String,
    /// Non-negative unit price
    pub price: Decimal,
    /// Primary image, if any
    pub img: Option<String>,
    pub image_urls: Vec<String>,
    pub color: String,
    /// Discount percentage (0-100)
    pub discount: Decimal,
    /// Known stock level
    pub available_quantity: Option<u32>,
    pub sku: Option<String>,
    pub category_ids: Vec<CategoryId>,
    pub tag_ids: Vec<TagId>,
}

/// Normalize a raw record into a [`Product`].
///
/// Returns `None` when the record carries neither `id` nor `_id`.
#[must_use]
pub fn normalize(raw: RawProduct) -> Option<Product> {
    let id = raw.id.or(raw.document_id)?;

    let name = first_present(raw.name, raw.product_name)
        .unwrap_or_else(|| UNNAMED_PRODUCT.to_string());
    let description = first_present(raw.description, raw.des)
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let image_urls: Vec<String> = raw
        .image_urls
        .unwrap_or_default()
        .into_iter()
        .filter(|url| !url.trim().is_empty())
        .collect();
    let img = non_blank(raw.img).or_else(|| image_urls.first().cloned());
    let image_urls = if image_urls.is_empty() {
        img.iter().cloned().collect()
    } else {
        image_urls
    };

    Some(Product {
        id,
        product_name: name.clone(),
        name,
        des: description.clone(),
        description,
        price: non_negative(raw.price.as_ref()),
        img,
        image_urls,
        color: non_blank(raw.color).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        discount: non_negative(raw.discount.as_ref()),
        available_quantity: raw.available_quantity.as_ref().and_then(quantity_from_json),
        sku: non_blank(raw.sku),
        category_ids: raw.category_ids.unwrap_or_default(),
        tag_ids: raw.tag_ids.unwrap_or_default(),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn first_present(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    non_blank(primary).or_else(|| non_blank(fallback))
}

/// Coerce a JSON amount to a non-negative decimal; absent or unparsable is zero.
fn non_negative(value: Option<&serde_json::Value>) -> Decimal {
    value
        .and_then(decimal_from_json)
        .filter(|amount| !amount.is_sign_negative())
        .unwrap_or_default()
}

fn quantity_from_json(value: &serde_json::Value) -> Option<u32> {
    let amount = decimal_from_json(value)?;
    if amount.is_sign_negative() {
        return Some(0);
    }
    amount.trunc().to_u32()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_product_name_and_string_price() {
        let product = normalize(raw(json!({"id": 1, "productName": "Shirt", "price": "19.99"})))
            .unwrap();
        assert_eq!(product.name, "Shirt");
        assert_eq!(product.product_name, "Shirt");
        assert_eq!(product.price, Decimal::new(1999, 2));
    }

    #[test]
    fn test_name_backfills_product_name() {
        let product = normalize(raw(json!({"id": 1, "name": "Hat", "des": "Warm"}))).unwrap();
        assert_eq!(product.product_name, "Hat");
        assert_eq!(product.description, "Warm");
        assert_eq!(product.des, "Warm");
    }

    #[test]
    fn test_placeholders_and_defaults() {
        let product = normalize(raw(json!({"_id": "abc"}))).unwrap();
        assert_eq!(product.id, ProductId::new("abc"));
        assert_eq!(product.name, UNNAMED_PRODUCT);
        assert_eq!(product.description, NO_DESCRIPTION);
        assert_eq!(product.color, DEFAULT_COLOR);
        assert_eq!(product.price, Decimal::ZERO);
        assert_eq!(product.discount, Decimal::ZERO);
        assert!(product.img.is_none());
        assert!(product.image_urls.is_empty());
    }

    #[test]
    fn test_prefers_id_over_document_id() {
        let product = normalize(raw(json!({"id": "a", "_id": "b"}))).unwrap();
        assert_eq!(product.id, ProductId::new("a"));
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(normalize(raw(json!({"name": "Ghost"}))).is_none());
    }

    #[test]
    fn test_bad_prices_become_zero() {
        for price in [json!("abc"), json!(null), json!(-5), json!({"amount": 1})] {
            let product = normalize(raw(json!({"id": 1, "price": price}))).unwrap();
            assert_eq!(product.price, Decimal::ZERO, "{price}");
        }
    }

    #[test]
    fn test_image_backfill_both_ways() {
        let product =
            normalize(raw(json!({"id": 1, "imageUrls": ["a.jpg", "b.jpg"]}))).unwrap();
        assert_eq!(product.img.as_deref(), Some("a.jpg"));

        let product = normalize(raw(json!({"id": 1, "img": "c.jpg"}))).unwrap();
        assert_eq!(product.image_urls, vec!["c.jpg".to_string()]);
    }

    #[test]
    fn test_available_quantity() {
        let product = normalize(raw(json!({"id": 1, "availableQuantity": "7"}))).unwrap();
        assert_eq!(product.available_quantity, Some(7));

        let product = normalize(raw(json!({"id": 1, "availableQuantity": -2}))).unwrap();
        assert_eq!(product.available_quantity, Some(0));

        let product = normalize(raw(json!({"id": 1}))).unwrap();
        assert_eq!(product.available_quantity, None);
    }
}
