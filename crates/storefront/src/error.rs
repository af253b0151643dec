//! Unified error handling with Sentry integration.
//!
//! Every store operation returns `Result<T, Error>`; [`Error::user_message`]
//! gives the text shown to the shopper.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::{CheckoutError, FormErrors};
use crate::config::ConfigError;
use crate::persist::PersistError;

/// Message shown when the backend rejects the session's credentials.
pub const UNAUTHORIZED_MESSAGE: &str =
    "You are not authorized to perform this action. Please log in again.";

/// Input rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Price range bounds are out of order or negative.
    #[error("Please enter valid price range (Min >= 0 and Max > Min).")]
    InvalidPriceRange { low: Decimal, high: Decimal },

    /// Cart quantities start at one.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// Requested quantity does not fit the cart's counters.
    #[error("Quantity is too large")]
    QuantityTooLarge,

    /// Requested quantity exceeds the known stock.
    #[error("Only {available} item(s) available, requested {requested}")]
    InsufficientStock { available: u32, requested: u32 },

    /// Cart totals exceed the representable amount.
    #[error("Cart total is too large")]
    TotalOverflow,

    /// Orders cannot be placed for an empty cart.
    #[error("Your cart is empty. Please add items to proceed.")]
    EmptyCart,

    /// Coupon code was blank.
    #[error("Coupon code is required")]
    EmptyCouponCode,

    /// Checkout form has invalid fields.
    #[error("Please correct the highlighted fields: {0}")]
    CustomerForm(FormErrors),
}

/// Storefront error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend request failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Input rejected locally.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation needs a signed-in user.
    #[error("Please sign in to continue")]
    Unauthenticated,

    /// Checkout flow was driven out of order.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Persisted state could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistError),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Text suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Authorization { .. }) => UNAUTHORIZED_MESSAGE.to_string(),
            Self::Api(ApiError::Network(_)) => {
                "Unable to reach the store. Please check your connection and try again."
                    .to_string()
            }
            Self::Api(err) => err.to_string(),
            Self::Validation(err) => err.to_string(),
            Self::Unauthenticated | Self::Checkout(_) => self.to_string(),
            Self::Persistence(_) | Self::Config(_) => "Internal error".to_string(),
        }
    }

    /// Whether the backend rejected the session's credentials.
    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(self, Self::Api(ApiError::Authorization { .. }))
    }
}

/// Result type alias for `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Set the Sentry user context from a user ID.
///
/// Call this after sign-in to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(ValidationError::EmptyCart);
        assert_eq!(
            err.to_string(),
            "Validation error: Your cart is empty. Please add items to proceed."
        );
        assert_eq!(
            err.user_message(),
            "Your cart is empty. Please add items to proceed."
        );
    }

    #[test]
    fn test_authorization_user_message() {
        for status in [401, 403] {
            let err = Error::from(ApiError::Authorization {
                status,
                message: "Forbidden".to_string(),
            });
            assert!(err.is_authorization());
            assert_eq!(err.user_message(), UNAUTHORIZED_MESSAGE);
        }
    }

    #[test]
    fn test_http_error_surfaces_backend_text() {
        let err = Error::from(ApiError::Http {
            status: 409,
            message: "Product out of stock".to_string(),
        });
        assert!(!err.is_authorization());
        assert!(err.user_message().contains("Product out of stock"));
    }

    #[test]
    fn test_price_range_message() {
        let err = ValidationError::InvalidPriceRange {
            low: Decimal::from(50),
            high: Decimal::from(10),
        };
        assert_eq!(
            err.to_string(),
            "Please enter valid price range (Min >= 0 and Max > Min)."
        );
    }
}
