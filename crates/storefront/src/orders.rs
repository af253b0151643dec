//! Order placement and history.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use orebi_core::{OperationStatus, OrderId, UserId};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::{error, info, instrument};

use crate::api::{CommerceApi, OrderItemRequest, OrderRecord, PlaceOrderRequest};
use crate::cart::CartSnapshot;
use crate::error::{Result, ValidationError};

/// An order as held by the store.
pub type Order = OrderRecord;

/// Current order, history and the status of the last operation.
///
/// Placement and history share one status flag.
#[derive(Debug, Clone, Default)]
pub struct OrderState {
    pub current_order: Option<Order>,
    pub orders: Vec<Order>,
    pub status: OperationStatus,
    pub error: Option<String>,
}

/// Build the placement request for a cart.
///
/// Line prices are effective (post line-discount) unit prices; the total is
/// the subtotal less the coupon discount, floored at zero.
#[must_use]
pub fn order_request(snapshot: &CartSnapshot) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: snapshot
            .lines
            .iter()
            .map(|line| OrderItemRequest {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price: line.effective_price(),
            })
            .collect(),
        total_amount: snapshot
            .subtotal
            .saturating_sub(snapshot.discount_amount)
            .max(Decimal::ZERO),
        shipping_charge: snapshot.shipping_charge,
        discount: snapshot.discount_amount,
        applied_coupon: snapshot.applied_coupon.clone().unwrap_or_default(),
    }
}

/// Order store.
pub struct OrderStore<A> {
    api: Arc<A>,
    state: RwLock<OrderState>,
}

impl<A: CommerceApi> OrderStore<A> {
    #[must_use]
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: RwLock::new(OrderState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, OrderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, OrderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> OrderState {
        self.read().clone()
    }

    /// The most recently placed or fetched order.
    #[must_use]
    pub fn current_order(&self) -> Option<Order> {
        self.read().current_order.clone()
    }

    pub fn clear_error(&self) {
        self.write().error = None;
    }

    /// Forget the current order and history.
    pub fn reset(&self) {
        *self.write() = OrderState::default();
    }

    fn record<T>(&self, result: Result<T>, apply: impl FnOnce(&mut OrderState, &T)) -> Result<T> {
        let mut state = self.write();
        match &result {
            Ok(value) => {
                apply(&mut state, value);
                state.status = OperationStatus::Succeeded;
            }
            Err(err) => {
                error!(error = %err, "Order operation failed");
                state.status = OperationStatus::Failed;
                state.error = Some(err.to_string());
            }
        }
        drop(state);
        result
    }

    fn begin(&self) {
        let mut state = self.write();
        state.status = OperationStatus::Loading;
        state.error = None;
    }

    /// Place an order for the cart and make it the current order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCart`] for an empty cart, or the
    /// backend error.
    #[instrument(skip(self, token, snapshot), fields(user_id = %user, lines = snapshot.lines.len()))]
    pub async fn place_order(
        &self,
        user: &UserId,
        token: &SecretString,
        snapshot: &CartSnapshot,
    ) -> Result<Order> {
        self.begin();

        let result = if snapshot.is_empty() {
            Err(ValidationError::EmptyCart.into())
        } else {
            self.api
                .place_order(user, token, &order_request(snapshot))
                .await
                .map_err(Into::into)
        };

        self.record(result, |state, order| {
            info!(order_id = %order.id, "Order placed");
            state.current_order = Some(order.clone());
        })
    }

    /// Fetch one order and make it the current order.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self, token), fields(order_id = %order_id, user_id = %user))]
    pub async fn fetch_order_by_id(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
    ) -> Result<Order> {
        self.begin();
        let result = self
            .api
            .get_order(order_id, user, token)
            .await
            .map_err(Into::into);
        self.record(result, |state, order| {
            state.current_order = Some(order.clone());
        })
    }

    /// Fetch the user's order history.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self, token), fields(user_id = %user))]
    pub async fn fetch_user_orders(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<Vec<Order>> {
        self.begin();
        let result = self
            .api
            .get_user_orders(user, token)
            .await
            .map_err(Into::into);
        self.record(result, |state, orders| state.orders.clone_from(orders))
    }
}
