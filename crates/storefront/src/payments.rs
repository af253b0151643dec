//! Payment initiation and status polling.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use orebi_core::{OperationStatus, OrderId, UserId};
use secrecy::SecretString;
use tracing::{error, instrument};

use crate::api::{CommerceApi, CustomerDetails, PaymentSession, PaymentStatusRecord};
use crate::error::Result;

/// Payment session, last polled status and the status of the last operation.
#[derive(Debug, Clone, Default)]
pub struct PaymentState {
    pub session: Option<PaymentSession>,
    pub payment_status: Option<PaymentStatusRecord>,
    pub status: OperationStatus,
    pub error: Option<String>,
}

/// Payment store. Failures are surfaced as-is; nothing is retried.
pub struct PaymentStore<A> {
    api: Arc<A>,
    state: RwLock<PaymentState>,
}

impl<A: CommerceApi> PaymentStore<A> {
    #[must_use]
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: RwLock::new(PaymentState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PaymentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> PaymentState {
        self.read().clone()
    }

    /// The active payment session, if any.
    #[must_use]
    pub fn session(&self) -> Option<PaymentSession> {
        self.read().session.clone()
    }

    /// Drop the payment session once the widget has reported an outcome.
    pub fn discard_session(&self) {
        self.write().session = None;
    }

    pub fn clear_error(&self) {
        self.write().error = None;
    }

    pub fn reset(&self) {
        *self.write() = PaymentState::default();
    }

    fn begin(&self) {
        let mut state = self.write();
        state.status = OperationStatus::Loading;
        state.error = None;
    }

    fn record<T>(
        &self,
        result: Result<T>,
        apply: impl FnOnce(&mut PaymentState, &T),
    ) -> Result<T> {
        let mut state = self.write();
        match &result {
            Ok(value) => {
                apply(&mut state, value);
                state.status = OperationStatus::Succeeded;
            }
            Err(err) => {
                error!(error = %err, "Payment operation failed");
                state.status = OperationStatus::Failed;
                state.error = Some(err.to_string());
            }
        }
        drop(state);
        result
    }

    /// Request signed payment parameters for an order.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self, token, customer), fields(order_id = %order_id, user_id = %user))]
    pub async fn initiate_payment(
        &self,
        order_id: &OrderId,
        user: &UserId,
        customer: &CustomerDetails,
        token: &SecretString,
    ) -> Result<PaymentSession> {
        self.begin();
        let result = self
            .api
            .initiate_payment(order_id, user, token, customer)
            .await
            .map_err(Into::into);
        self.record(result, |state, session| {
            state.session = Some(session.clone());
        })
    }

    /// Poll the payment status of an order.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self, token), fields(order_id = %order_id, user_id = %user))]
    pub async fn fetch_payment_status(
        &self,
        order_id: &OrderId,
        user: &UserId,
        token: &SecretString,
    ) -> Result<PaymentStatusRecord> {
        self.begin();
        let result = self
            .api
            .get_payment_status(order_id, user, token)
            .await
            .map_err(Into::into);
        self.record(result, |state, status| {
            state.payment_status = Some(status.clone());
        })
    }
}
