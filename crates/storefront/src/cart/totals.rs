//! Cart lines and derived totals.
//!
//! Totals are recomputed from scratch by [`CartSnapshot::recompute`] after
//! every mutation; nothing here performs I/O. Backend prices are unbounded,
//! so totals use checked arithmetic and report overflow instead of panicking.

use orebi_core::{CartItemId, CategoryId, ProductId, TagId, round_money, shipping_charge};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::CartItemRecord;
use crate::catalog::Product;
use crate::error::ValidationError;

/// Name used for lines whose product could not be loaded.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Image used for lines whose product could not be loaded.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-image.jpg";

const ONE_HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// A server cart item joined with product detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Server cart-item id; absent until the backend reports one
    pub cart_item_id: Option<CartItemId>,
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: String,
    pub images: Vec<String>,
    pub quantity: u32,
    pub available_quantity: Option<u32>,
    /// Discount percentage (0-100)
    pub discount: Decimal,
    pub color: String,
    pub sku: Option<String>,
    pub category_ids: Vec<CategoryId>,
    pub tag_ids: Vec<TagId>,
    /// Set when product detail could not be loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CartLine {
    /// Build a line from a normalized product.
    #[must_use]
    pub fn from_product(
        product: &Product,
        quantity: u32,
        cart_item_id: Option<CartItemId>,
    ) -> Self {
        Self {
            cart_item_id,
            product_id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image: product
                .img
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            images: product.image_urls.clone(),
            quantity,
            available_quantity: product.available_quantity,
            discount: product.discount,
            color: product.color.clone(),
            sku: product.sku.clone(),
            category_ids: product.category_ids.clone(),
            tag_ids: product.tag_ids.clone(),
            error: None,
        }
    }

    /// Line kept for a cart item whose product detail failed to load.
    #[must_use]
    pub fn placeholder(
        product_id: ProductId,
        cart_item_id: Option<CartItemId>,
        name: Option<String>,
        quantity: u32,
        error: String,
    ) -> Self {
        Self {
            cart_item_id,
            product_id,
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
            description: String::new(),
            price: Decimal::ZERO,
            image: PLACEHOLDER_IMAGE.to_string(),
            images: Vec::new(),
            quantity,
            available_quantity: None,
            discount: Decimal::ZERO,
            color: crate::catalog::DEFAULT_COLOR.to_string(),
            sku: None,
            category_ids: Vec::new(),
            tag_ids: Vec::new(),
            error: Some(error),
        }
    }

    /// Placeholder for a server cart item.
    #[must_use]
    pub fn placeholder_for(record: &CartItemRecord, error: String) -> Self {
        Self::placeholder(
            record.product_id.clone(),
            Some(record.id.clone()),
            record.product_name.clone(),
            record.quantity,
            error,
        )
    }

    /// Unit price after the line's percentage discount, rounded to cents.
    ///
    /// Discounts above 100% are treated as 100%.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        if self.discount > Decimal::ZERO {
            let rate = self.discount.min(ONE_HUNDRED) / ONE_HUNDRED;
            round_money(self.price - self.price * rate)
        } else {
            self.price
        }
    }

    /// Quantity times effective price; `None` if it does not fit a
    /// [`Decimal`].
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.effective_price()
            .checked_mul(Decimal::from(self.quantity))
    }

    /// Id the backend expects for item-level calls.
    #[must_use]
    pub fn item_key(&self) -> &str {
        self.cart_item_id
            .as_ref()
            .map_or_else(|| self.product_id.as_str(), CartItemId::as_str)
    }
}

/// Cart contents with derived totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
    pub shipping_charge: Decimal,
    pub applied_coupon: Option<String>,
    pub discount_amount: Decimal,
}

impl CartSnapshot {
    /// Snapshot of `lines` with no coupon applied.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TotalOverflow`] if the totals do not fit a
    /// [`Decimal`].
    pub fn from_lines(lines: Vec<CartLine>) -> Result<Self, ValidationError> {
        let mut snapshot = Self {
            lines,
            ..Self::default()
        };
        snapshot.recompute()?;
        Ok(snapshot)
    }

    /// Recompute subtotal and shipping from the lines.
    ///
    /// Shipping is tiered on the pre-discount subtotal; an empty cart ships
    /// free.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TotalOverflow`] if the totals do not fit a
    /// [`Decimal`]; the snapshot is left unchanged.
    pub fn recompute(&mut self) -> Result<(), ValidationError> {
        let subtotal = self
            .lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| {
                line.line_total().and_then(|total| sum.checked_add(total))
            })
            .ok_or(ValidationError::TotalOverflow)?;
        let shipping = if self.lines.is_empty() {
            Decimal::ZERO
        } else {
            shipping_charge(subtotal)
        };
        subtotal
            .checked_add(shipping)
            .ok_or(ValidationError::TotalOverflow)?;

        self.subtotal = subtotal;
        self.shipping_charge = shipping;
        Ok(())
    }

    /// Subtotal minus discount (never negative) plus shipping.
    #[must_use]
    pub fn grand_total(&self) -> Decimal {
        self.subtotal
            .saturating_sub(self.discount_amount)
            .max(Decimal::ZERO)
            .saturating_add(self.shipping_charge)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0, |count: u32, line| count.saturating_add(line.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the line matching `id` (cart-item id, falling back to
    /// product id).
    #[must_use]
    pub fn line_index(&self, id: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.cart_item_id.as_ref().is_some_and(|item| item.as_str() == id))
            .or_else(|| self.lines.iter().position(|line| line.product_id.as_str() == id))
    }

    /// Line matching `id`; see [`CartSnapshot::line_index`].
    #[must_use]
    pub fn find_line(&self, id: &str) -> Option<&CartLine> {
        self.line_index(id).and_then(|index| self.lines.get(index))
    }

    /// Line for a product.
    #[must_use]
    pub fn line_for_product(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn line(id: &str, price: Decimal, quantity: u32) -> CartLine {
        CartLine {
            cart_item_id: Some(CartItemId::new(format!("item-{id}"))),
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price,
            image: PLACEHOLDER_IMAGE.to_string(),
            images: Vec::new(),
            quantity,
            available_quantity: None,
            discount: Decimal::ZERO,
            color: "Red".to_string(),
            sku: None,
            category_ids: Vec::new(),
            tag_ids: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_subtotal_shipping_and_grand_total() {
        let snapshot = CartSnapshot::from_lines(vec![
            line("a", Decimal::from(100), 2),
            line("b", Decimal::from(50), 1),
        ])
        .unwrap();

        assert_eq!(snapshot.subtotal, Decimal::from(250));
        assert_eq!(snapshot.shipping_charge, Decimal::from(25));
        assert_eq!(snapshot.grand_total(), Decimal::from(275));
        assert_eq!(snapshot.item_count(), 3);
    }

    #[test]
    fn test_coupon_does_not_change_shipping() {
        let mut snapshot = CartSnapshot::from_lines(vec![
            line("a", Decimal::from(100), 2),
            line("b", Decimal::from(50), 1),
        ])
        .unwrap();
        snapshot.applied_coupon = Some("SAVE30".to_string());
        snapshot.discount_amount = Decimal::from(30);
        snapshot.recompute().unwrap();

        assert_eq!(snapshot.shipping_charge, Decimal::from(25));
        assert_eq!(snapshot.grand_total(), Decimal::from(245));
    }

    #[test]
    fn test_discount_larger_than_subtotal_floors_at_zero() {
        let mut snapshot =
            CartSnapshot::from_lines(vec![line("a", Decimal::from(10), 1)]).unwrap();
        snapshot.discount_amount = Decimal::from(50);
        assert_eq!(snapshot.grand_total(), Decimal::from(30));
    }

    #[test]
    fn test_empty_cart_ships_free() {
        let snapshot = CartSnapshot::from_lines(Vec::new()).unwrap();
        assert_eq!(snapshot.subtotal, Decimal::ZERO);
        assert_eq!(snapshot.shipping_charge, Decimal::ZERO);
        assert_eq!(snapshot.grand_total(), Decimal::ZERO);
    }

    #[test]
    fn test_shipping_boundaries() {
        let shipping_for = |price| {
            CartSnapshot::from_lines(vec![line("a", price, 1)])
                .unwrap()
                .shipping_charge
        };
        assert_eq!(shipping_for(Decimal::new(20000, 2)), Decimal::from(30));
        assert_eq!(shipping_for(Decimal::new(20001, 2)), Decimal::from(25));
        assert_eq!(shipping_for(Decimal::new(40000, 2)), Decimal::from(25));
        assert_eq!(shipping_for(Decimal::new(40001, 2)), Decimal::from(20));
    }

    #[test]
    fn test_effective_price_applies_discount() {
        let mut discounted = line("a", Decimal::new(1999, 2), 1);
        discounted.discount = Decimal::from(15);
        // 19.99 - 2.9985 = 16.9915
        assert_eq!(discounted.effective_price(), Decimal::new(1699, 2));
        discounted.quantity = 3;
        assert_eq!(discounted.line_total(), Some(Decimal::new(5097, 2)));
    }

    #[test]
    fn test_find_line_prefers_cart_item_id() {
        let mut a = line("1", Decimal::ONE, 1);
        a.cart_item_id = Some(CartItemId::new("2"));
        let b = line("2", Decimal::ONE, 1);
        let snapshot = CartSnapshot::from_lines(vec![b, a]).unwrap();

        assert_eq!(snapshot.find_line("2").unwrap().product_id.as_str(), "1");
        assert_eq!(snapshot.find_line("item-2").unwrap().product_id.as_str(), "2");
        assert!(snapshot.find_line("missing").is_none());
    }

    #[test]
    fn test_placeholder_line() {
        let record = CartItemRecord {
            id: CartItemId::new("9"),
            product_id: ProductId::new("p9"),
            quantity: 2,
            product_name: None,
        };
        let line = CartLine::placeholder_for(&record, "boom".to_string());
        assert_eq!(line.name, UNKNOWN_PRODUCT);
        assert_eq!(line.price, Decimal::ZERO);
        assert_eq!(line.image, PLACEHOLDER_IMAGE);
        assert_eq!(line.error.as_deref(), Some("boom"));
        assert_eq!(line.item_key(), "9");
    }

    #[test]
    fn test_discount_above_one_hundred_percent_is_capped() {
        let mut free = line("a", Decimal::from(40), 2);
        free.discount = Decimal::from(150);
        assert_eq!(free.effective_price(), Decimal::ZERO);
        assert_eq!(free.line_total(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_overflowing_line_total_is_rejected() {
        let err = CartSnapshot::from_lines(vec![line("a", Decimal::MAX, 2)]).unwrap_err();
        assert_eq!(err, ValidationError::TotalOverflow);

        let err = CartSnapshot::from_lines(vec![
            line("a", Decimal::MAX, 1),
            line("b", Decimal::MAX, 1),
        ])
        .unwrap_err();
        assert_eq!(err, ValidationError::TotalOverflow);
    }

    #[test]
    fn test_failed_recompute_keeps_previous_totals() {
        let mut snapshot =
            CartSnapshot::from_lines(vec![line("a", Decimal::from(100), 2)]).unwrap();
        snapshot.lines.push(line("b", Decimal::MAX, 3));

        assert!(snapshot.recompute().is_err());
        assert_eq!(snapshot.subtotal, Decimal::from(200));
        assert_eq!(snapshot.shipping_charge, Decimal::from(30));
    }

    #[test]
    fn test_item_count_saturates() {
        let snapshot = CartSnapshot::from_lines(vec![
            line("a", Decimal::ZERO, u32::MAX),
            line("b", Decimal::ZERO, 5),
        ])
        .unwrap();
        assert_eq!(snapshot.item_count(), u32::MAX);
    }

    #[test]
    fn test_subtotal_is_sum_of_line_totals() {
        let mut rng = StdRng::seed_from_u64(0x7a11);

        for _ in 0..200 {
            let count = rng.random_range(0..=8);
            let lines: Vec<CartLine> = (0..count)
                .map(|i| {
                    let mut cart_line = line(
                        &i.to_string(),
                        Decimal::new(rng.random_range(0..=1_000_000), 2),
                        rng.random_range(1..=20),
                    );
                    cart_line.discount = Decimal::from(rng.random_range(0..=100_u32));
                    cart_line
                })
                .collect();

            let expected: Decimal = lines
                .iter()
                .map(|l| l.effective_price() * Decimal::from(l.quantity))
                .sum();
            let snapshot = CartSnapshot::from_lines(lines).unwrap();

            assert_eq!(snapshot.subtotal, expected);
            assert!(snapshot.subtotal >= Decimal::ZERO);
            let expected_shipping = if count == 0 {
                Decimal::ZERO
            } else {
                shipping_charge(expected)
            };
            assert_eq!(snapshot.shipping_charge, expected_shipping);
            assert_eq!(
                snapshot.grand_total(),
                snapshot.subtotal + snapshot.shipping_charge
            );
        }
    }
}
