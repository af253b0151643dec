//! Money helpers using decimal arithmetic.
//!
//! The storefront works in a single currency whose units are whatever the
//! backend returns; there is no conversion. Amounts are held as
//! [`Decimal`] so cart totals are exact sums.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Subtotals at or below this amount fall in the [`ShippingTier::Standard`] tier.
pub const STANDARD_TIER_LIMIT: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Subtotals at or below this amount (and above the standard limit) fall in
/// the [`ShippingTier::Reduced`] tier.
pub const REDUCED_TIER_LIMIT: Decimal = Decimal::from_parts(400, 0, 0, false, 0);

/// Flat shipping tier selected by cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingTier {
    /// Subtotal ≤ 200: charge 30.
    Standard,
    /// 200 < subtotal ≤ 400: charge 25.
    Reduced,
    /// Subtotal > 400: charge 20.
    Bulk,
}

impl ShippingTier {
    /// Select the tier for a subtotal.
    #[must_use]
    pub fn for_subtotal(subtotal: Decimal) -> Self {
        if subtotal <= STANDARD_TIER_LIMIT {
            Self::Standard
        } else if subtotal <= REDUCED_TIER_LIMIT {
            Self::Reduced
        } else {
            Self::Bulk
        }
    }

    /// Flat charge for this tier.
    #[must_use]
    pub const fn charge(self) -> Decimal {
        match self {
            Self::Standard => Decimal::from_parts(30, 0, 0, false, 0),
            Self::Reduced => Decimal::from_parts(25, 0, 0, false, 0),
            Self::Bulk => Decimal::from_parts(20, 0, 0, false, 0),
        }
    }
}

/// Shipping charge for a subtotal (step function over three tiers).
#[must_use]
pub fn shipping_charge(subtotal: Decimal) -> Decimal {
    ShippingTier::for_subtotal(subtotal).charge()
}

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount with exactly two decimal places (e.g. `"275.00"`).
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

/// Parse a decimal from a JSON number or numeric string.
///
/// Returns `None` for any other JSON shape or an unparsable string.
#[must_use]
pub fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
        serde_json::Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Serde helpers for amounts the backend may send as numbers, numeric
/// strings or `null`.
pub mod lenient {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};

    /// Deserialize a lenient amount, defaulting to zero.
    ///
    /// # Errors
    ///
    /// Never fails on well-formed JSON; unparsable values become zero.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(super::decimal_from_json)
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shipping_tier_boundaries() {
        assert_eq!(shipping_charge(Decimal::ZERO), Decimal::from(30));
        assert_eq!(shipping_charge(Decimal::new(20000, 2)), Decimal::from(30));
        assert_eq!(shipping_charge(Decimal::new(20001, 2)), Decimal::from(25));
        assert_eq!(shipping_charge(Decimal::new(40000, 2)), Decimal::from(25));
        assert_eq!(shipping_charge(Decimal::new(40001, 2)), Decimal::from(20));
        assert_eq!(shipping_charge(Decimal::from(10_000)), Decimal::from(20));
    }

    #[test]
    fn test_shipping_tier_selection() {
        assert_eq!(
            ShippingTier::for_subtotal(Decimal::from(250)),
            ShippingTier::Reduced
        );
        assert_eq!(
            ShippingTier::for_subtotal(Decimal::from(401)),
            ShippingTier::Bulk
        );
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(16_9915, 4)), Decimal::new(1699, 2));
        assert_eq!(round_money(Decimal::new(1_005, 3)), Decimal::new(101, 2));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from(275)), "275.00");
        assert_eq!(format_amount(Decimal::new(1999, 2)), "19.99");
    }

    #[test]
    fn test_decimal_from_json_number_and_string() {
        assert_eq!(decimal_from_json(&json!(19.99)), Some(Decimal::new(1999, 2)));
        assert_eq!(decimal_from_json(&json!("19.99")), Some(Decimal::new(1999, 2)));
        assert_eq!(decimal_from_json(&json!(" 5 ")), Some(Decimal::from(5)));
        assert_eq!(decimal_from_json(&json!(100)), Some(Decimal::from(100)));
    }

    #[test]
    fn test_decimal_from_json_rejects_garbage() {
        assert_eq!(decimal_from_json(&json!("abc")), None);
        assert_eq!(decimal_from_json(&json!("")), None);
        assert_eq!(decimal_from_json(&json!(null)), None);
        assert_eq!(decimal_from_json(&json!([1])), None);
    }

    #[test]
    fn test_lenient_deserialize() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, with = "lenient")]
            amount: Decimal,
        }

        let row: Row = serde_json::from_str(r#"{"amount": "12.50"}"#).unwrap();
        assert_eq!(row.amount, Decimal::new(1250, 2));
        let row: Row = serde_json::from_str(r#"{"amount": null}"#).unwrap();
        assert_eq!(row.amount, Decimal::ZERO);
        let row: Row = serde_json::from_str("{}").unwrap();
        assert_eq!(row.amount, Decimal::ZERO);
    }
}
