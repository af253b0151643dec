//! Checkout orchestration.
//!
//! Sequences cart → order → payment → external payment widget → terminal
//! outcome. One [`Checkout`] is one attempt: it accepts exactly one widget
//! outcome and rejects anything after it.
//!
//! # Flow
//!
//! ```text
//! enter ──► (place order) ──► submit(form) ──► widget ──► resolve(outcome)
//!   │                            │                            │
//!   └─► SignIn / Cart / Error    └─► form errors / Error      └─► Success / Cancel / Error
//! ```

use std::collections::BTreeMap;
use std::fmt;

use orebi_core::{Email, OrderId, PhoneNumber, UserId, format_amount};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::{CommerceApi, CustomerDetails, PaymentSession};
use crate::cart::CartSnapshot;
use crate::error::{Error, ValidationError, add_breadcrumb};
use crate::orders::Order;
use crate::state::Storefront;

/// Path of the checkout page, used as the sign-in return target.
pub const CHECKOUT_PATH: &str = "/checkout";

// =============================================================================
// Customer form
// =============================================================================

/// Checkout form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    Country,
}

impl FormField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::City => "city",
            Self::Country => "country",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Raw checkout form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

impl CustomerForm {
    /// Empty form with the country prefilled.
    #[must_use]
    pub fn with_country(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..Self::default()
        }
    }

    /// Validate every field, collecting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns the message for each invalid field.
    pub fn validate(&self, phone_prefix: &str) -> Result<CustomerDetails, FormErrors> {
        let mut errors = FormErrors::default();

        let mut required = |field: FormField, value: &str, label: &str| {
            let value = value.trim();
            if value.is_empty() {
                errors.insert(field, format!("{label} is required"));
            }
            value.to_string()
        };
        let first_name = required(FormField::FirstName, &self.first_name, "First name");
        let last_name = required(FormField::LastName, &self.last_name, "Last name");
        let address = required(FormField::Address, &self.address, "Address");
        let city = required(FormField::City, &self.city, "City");
        let country = required(FormField::Country, &self.country, "Country");

        let email = Email::parse(&self.email)
            .map_err(|e| errors.insert(FormField::Email, e.to_string()))
            .ok();
        let phone = PhoneNumber::parse_with_prefix(&self.phone, phone_prefix)
            .map_err(|e| errors.insert(FormField::Phone, e.to_string()))
            .ok();

        match (email, phone) {
            (Some(email), Some(phone)) if errors.is_empty() => Ok(CustomerDetails {
                first_name,
                last_name,
                email: email.into_inner(),
                phone: phone.as_str().to_string(),
                address,
                city,
                country,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Payment widget
// =============================================================================

/// Parameters handed to the external payment widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetRequest {
    pub sandbox: bool,
    pub merchant_id: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    pub order_id: OrderId,
    pub items: String,
    /// Two-decimal amount, e.g. `"275.00"`
    pub amount: String,
    pub currency: String,
    pub hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_country: String,
    /// Paying user's id
    pub custom_1: String,
    pub custom_2: String,
}

impl WidgetRequest {
    /// Combine the backend's signed session with the customer's details.
    #[must_use]
    pub fn new(session: &PaymentSession, customer: &CustomerDetails, user: &UserId) -> Self {
        Self {
            sandbox: session.sandbox,
            merchant_id: session.merchant_id.clone(),
            return_url: session.return_url.clone(),
            cancel_url: session.cancel_url.clone(),
            notify_url: session.notify_url.clone(),
            order_id: session.order_id.clone(),
            items: session.items.clone(),
            amount: format_amount(session.amount),
            currency: session.currency.clone(),
            hash: session.hash.clone(),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            city: customer.city.clone(),
            country: customer.country.clone(),
            delivery_address: customer.address.clone(),
            delivery_city: customer.city.clone(),
            delivery_country: customer.country.clone(),
            custom_1: user.to_string(),
            custom_2: String::new(),
        }
    }
}

/// The widget could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct WidgetError(pub String);

/// External payment widget.
///
/// `start_payment` only launches the widget; its terminal outcome comes back
/// later through [`Checkout::resolve`].
pub trait PaymentWidget {
    /// Launch the widget.
    ///
    /// # Errors
    ///
    /// Returns an error if the widget is unavailable.
    fn start_payment(&self, request: &WidgetRequest) -> Result<(), WidgetError>;
}

/// Terminal outcome reported by the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetOutcome {
    Completed(OrderId),
    Dismissed,
    Error(String),
}

// =============================================================================
// Navigation
// =============================================================================

/// Where checkout sends the shopper next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    SignIn { return_to: String },
    Cart { message: String },
    Success { order_id: OrderId },
    Cancel { order_id: Option<OrderId> },
    Error { message: String },
}

impl Navigation {
    /// Route path for this destination.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::SignIn { return_to } => {
                format!("/signin?redirect={}", urlencoding::encode(return_to))
            }
            Self::Cart { .. } => "/cart".to_string(),
            Self::Success { order_id } => {
                format!("/payment/success?orderId={}", urlencoding::encode(order_id.as_str()))
            }
            Self::Cancel { order_id: Some(order_id) } => {
                format!("/payment/cancel?orderId={}", urlencoding::encode(order_id.as_str()))
            }
            Self::Cancel { order_id: None } => "/payment/cancel".to_string(),
            Self::Error { message } => {
                format!("/payment/error?message={}", urlencoding::encode(message))
            }
        }
    }

    fn from_error(err: &Error) -> Self {
        Self::Error {
            message: err.user_message(),
        }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Checkout driven out of order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("No order has been placed for this checkout")]
    OrderNotPlaced,
    #[error("Checkout is not waiting for a payment outcome")]
    NotAwaitingPayment,
    #[error("Checkout already finished")]
    AlreadyFinished,
}

/// Why a form submission did not launch the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Stay on the form and show these messages.
    Invalid(FormErrors),
    /// Leave checkout.
    Navigate(Navigation),
    /// Called in the wrong stage.
    OutOfOrder(CheckoutError),
}

#[derive(Debug, Clone)]
enum Stage {
    Started,
    OrderPlaced(Order),
    AwaitingPayment(Order),
    Finished(Navigation),
}

/// One checkout attempt.
pub struct Checkout<'a, A> {
    storefront: &'a Storefront<A>,
    stage: Stage,
}

impl<'a, A: CommerceApi> Checkout<'a, A> {
    #[must_use]
    pub const fn new(storefront: &'a Storefront<A>) -> Self {
        Self {
            storefront,
            stage: Stage::Started,
        }
    }

    /// The order this checkout pays for, once placed.
    #[must_use]
    pub const fn order(&self) -> Option<&Order> {
        match &self.stage {
            Stage::OrderPlaced(order) | Stage::AwaitingPayment(order) => Some(order),
            Stage::Started | Stage::Finished(_) => None,
        }
    }

    /// Whether a terminal outcome has been accepted.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Finished(_))
    }

    /// Enter checkout: require a session and a non-empty cart, then place an
    /// order unless the current one already covers this cart.
    ///
    /// # Errors
    ///
    /// Returns the navigation to follow when checkout cannot proceed.
    #[instrument(skip(self))]
    pub async fn enter(&mut self) -> Result<Order, Navigation> {
        if let Stage::Finished(nav) = &self.stage {
            return Err(nav.clone());
        }

        let Some(session) = self.storefront.session() else {
            return Err(Navigation::SignIn {
                return_to: CHECKOUT_PATH.to_string(),
            });
        };

        let snapshot = self.storefront.cart().snapshot();
        if snapshot.is_empty() {
            return Err(Navigation::Cart {
                message: ValidationError::EmptyCart.to_string(),
            });
        }

        let existing = self
            .storefront
            .orders()
            .current_order()
            .filter(|order| order_covers_cart(order, &snapshot));

        let order = if let Some(order) = existing {
            order
        } else {
            self.storefront
                .orders()
                .place_order(session.user_id(), &session.token, &snapshot)
                .await
                .map_err(|err| Navigation::from_error(&err))?
        };

        add_breadcrumb("checkout", "Order ready", Some(&[("order_id", order.id.as_str())]));
        self.stage = Stage::OrderPlaced(order.clone());
        Ok(order)
    }

    /// Validate the form, initiate payment and launch the widget.
    ///
    /// # Errors
    ///
    /// See [`SubmitError`].
    #[instrument(skip(self, form, widget))]
    pub async fn submit(
        &mut self,
        form: &CustomerForm,
        widget: &impl PaymentWidget,
    ) -> Result<WidgetRequest, SubmitError> {
        let order = match &self.stage {
            Stage::OrderPlaced(order) => order.clone(),
            Stage::Started => return Err(SubmitError::OutOfOrder(CheckoutError::OrderNotPlaced)),
            Stage::AwaitingPayment(_) => {
                return Err(SubmitError::OutOfOrder(CheckoutError::NotAwaitingPayment));
            }
            Stage::Finished(_) => {
                return Err(SubmitError::OutOfOrder(CheckoutError::AlreadyFinished));
            }
        };

        let customer = form
            .validate(&self.storefront.config().phone_prefix)
            .map_err(SubmitError::Invalid)?;

        let Some(session) = self.storefront.session() else {
            return Err(SubmitError::Navigate(Navigation::SignIn {
                return_to: CHECKOUT_PATH.to_string(),
            }));
        };

        let payment = self
            .storefront
            .payments()
            .initiate_payment(&order.id, session.user_id(), &customer, &session.token)
            .await
            .map_err(|err| SubmitError::Navigate(Navigation::from_error(&err)))?;

        let request = WidgetRequest::new(&payment, &customer, session.user_id());
        if let Err(err) = widget.start_payment(&request) {
            warn!(error = %err, "Payment widget failed to start");
            self.storefront.payments().discard_session();
            return Err(SubmitError::Navigate(Navigation::Error {
                message: err.to_string(),
            }));
        }

        add_breadcrumb("checkout", "Payment widget started", Some(&[("order_id", order.id.as_str())]));
        self.stage = Stage::AwaitingPayment(order);
        Ok(request)
    }

    /// Accept the widget's terminal outcome. Only the first call succeeds.
    ///
    /// A completed payment clears the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AlreadyFinished`] for any outcome after the
    /// first, or [`CheckoutError::NotAwaitingPayment`] before the widget was
    /// started.
    #[instrument(skip(self))]
    pub async fn resolve(&mut self, outcome: WidgetOutcome) -> Result<Navigation, CheckoutError> {
        let order = match &self.stage {
            Stage::AwaitingPayment(order) => order.clone(),
            Stage::Finished(_) => return Err(CheckoutError::AlreadyFinished),
            Stage::Started | Stage::OrderPlaced(_) => {
                return Err(CheckoutError::NotAwaitingPayment);
            }
        };

        // Claim the outcome before awaiting anything
        self.stage = Stage::Finished(Navigation::Cancel { order_id: None });
        self.storefront.payments().discard_session();

        let navigation = match outcome {
            WidgetOutcome::Completed(order_id) => {
                info!(order_id = %order_id, "Payment completed");
                self.clear_cart_after_payment().await;
                Navigation::Success { order_id }
            }
            WidgetOutcome::Dismissed => {
                info!(order_id = %order.id, "Payment dismissed");
                Navigation::Cancel {
                    order_id: Some(order.id),
                }
            }
            WidgetOutcome::Error(message) => {
                warn!(order_id = %order.id, error = %message, "Payment widget reported an error");
                Navigation::Error { message }
            }
        };

        let path = navigation.path();
        add_breadcrumb("checkout", "Payment outcome", Some(&[("path", path.as_str())]));
        self.stage = Stage::Finished(navigation.clone());
        Ok(navigation)
    }

    async fn clear_cart_after_payment(&self) {
        let cart = self.storefront.cart();
        let Some(session) = self.storefront.session() else {
            cart.reset();
            return;
        };
        if let Err(err) = cart.clear_cart(session.user_id(), &session.token).await {
            warn!(error = %err, "Failed to clear server cart after payment");
            cart.reset();
        }
    }
}

/// Whether `order` was placed for exactly the lines in `snapshot` and is
/// still unpaid.
fn order_covers_cart(order: &Order, snapshot: &CartSnapshot) -> bool {
    if order.payment_status != orebi_core::PaymentStatus::Pending
        || order.items.len() != snapshot.lines.len()
    {
        return false;
    }
    snapshot.lines.iter().all(|line| {
        order
            .items
            .iter()
            .any(|item| item.product_id == line.product_id && item.quantity == line.quantity)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn valid_form() -> CustomerForm {
        CustomerForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+94771234567".to_string(),
            address: "1 Main St".to_string(),
            city: "Colombo".to_string(),
            country: "Sri Lanka".to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let customer = valid_form().validate("+94").unwrap();
        assert_eq!(customer.email, "ada@example.com");
        assert_eq!(customer.phone, "+94771234567");
    }

    #[test]
    fn test_form_collects_every_error() {
        let form = CustomerForm {
            email: "not-an-email".to_string(),
            phone: "0771234567".to_string(),
            ..CustomerForm::with_country("Sri Lanka")
        };
        let errors = form.validate("+94").unwrap_err();

        assert_eq!(errors.len(), 6);
        assert_eq!(errors.get(FormField::FirstName), Some("First name is required"));
        assert_eq!(errors.get(FormField::Email), Some("Invalid email format"));
        assert_eq!(
            errors.get(FormField::Phone),
            Some("Invalid phone number (e.g., +94771234567)")
        );
        assert!(errors.get(FormField::Country).is_none());
    }

    #[test]
    fn test_form_errors_display() {
        let form = CustomerForm {
            first_name: " ".to_string(),
            ..valid_form()
        };
        let errors = form.validate("+94").unwrap_err();
        assert_eq!(errors.to_string(), "firstName: First name is required");
    }

    #[test]
    fn test_widget_request() {
        let session = PaymentSession {
            sandbox: true,
            merchant_id: "1211149".to_string(),
            return_url: "https://shop.example.com/payment/success".to_string(),
            cancel_url: "https://shop.example.com/payment/cancel".to_string(),
            notify_url: "https://api.example.com/api/payments/notify".to_string(),
            order_id: OrderId::new("17"),
            items: "Order #17".to_string(),
            amount: Decimal::from(275),
            currency: "LKR".to_string(),
            hash: "ABCDEF".to_string(),
        };
        let customer = valid_form().validate("+94").unwrap();
        let request = WidgetRequest::new(&session, &customer, &UserId::new("42"));

        assert_eq!(request.amount, "275.00");
        assert_eq!(request.delivery_city, "Colombo");
        assert_eq!(request.custom_1, "42");
        assert_eq!(request.custom_2, "");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["merchant_id"], "1211149");
        assert_eq!(json["order_id"], "17");
    }

    #[test]
    fn test_navigation_paths() {
        assert_eq!(
            Navigation::SignIn {
                return_to: CHECKOUT_PATH.to_string()
            }
            .path(),
            "/signin?redirect=%2Fcheckout"
        );
        assert_eq!(
            Navigation::Success {
                order_id: OrderId::new("17")
            }
            .path(),
            "/payment/success?orderId=17"
        );
        assert_eq!(
            Navigation::Cancel { order_id: None }.path(),
            "/payment/cancel"
        );
        assert_eq!(
            Navigation::Error {
                message: "Card declined".to_string()
            }
            .path(),
            "/payment/error?message=Card%20declined"
        );
    }
}
