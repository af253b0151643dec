//! Cart synchronization store.
//!
//! The backend owns the cart's item list; the store joins it with product
//! detail and keeps derived totals. Mutations are serialized through an
//! operation gate held across the whole request, so two overlapping
//! operations can never interleave their read-modify-write.

mod totals;

pub use totals::{CartLine, CartSnapshot, PLACEHOLDER_IMAGE, UNKNOWN_PRODUCT};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join_all;
use orebi_core::{CartItemId, OperationStatus, ProductId, UserId};
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

use crate::api::{AddItemResponse, ApiError, CartItemRecord, CommerceApi};
use crate::catalog::{CatalogClient, Product};
use crate::error::{Error, Result, ValidationError};

/// Cart contents plus the status of the last operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub snapshot: CartSnapshot,
    pub status: OperationStatus,
    pub error: Option<String>,
}

/// Client-side mirror of the user's server cart.
pub struct CartStore<A> {
    api: Arc<A>,
    catalog: CatalogClient<A>,
    state: RwLock<CartState>,
    ops: Mutex<()>,
}

impl<A: CommerceApi> CartStore<A> {
    /// Create an empty cart store.
    #[must_use]
    pub fn new(api: Arc<A>, catalog: CatalogClient<A>) -> Self {
        Self {
            api,
            catalog,
            state: RwLock::new(CartState::default()),
            ops: Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Local state
    // =========================================================================

    /// Current cart contents and totals.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.read().snapshot.clone()
    }

    /// Current contents plus status and error.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.read().clone()
    }

    /// Clear the recorded error.
    pub fn clear_error(&self) {
        self.write().error = None;
    }

    /// Drop all local state (e.g. on sign-out). The server cart is untouched.
    pub fn reset(&self) {
        *self.write() = CartState::default();
    }

    /// Seed lines from persisted state without contacting the backend.
    ///
    /// Lines whose totals overflow are discarded and the error is recorded.
    pub fn restore_lines(&self, lines: Vec<CartLine>) {
        let lines = lines.into_iter().filter(|line| line.quantity > 0).collect();
        match CartSnapshot::from_lines(lines) {
            Ok(snapshot) => self.write().snapshot = snapshot,
            Err(err) => {
                warn!(error = %err, "Discarding persisted cart");
                let mut state = self.write();
                state.snapshot = CartSnapshot::default();
                state.error = Some(Error::from(err).to_string());
            }
        }
    }

    fn begin(&self) {
        let mut state = self.write();
        state.status = OperationStatus::Loading;
        state.error = None;
    }

    /// Apply a backend result to a copy of the cart and commit it if its
    /// totals are representable.
    fn succeed(
        &self,
        apply: impl FnOnce(&mut CartSnapshot),
    ) -> std::result::Result<CartSnapshot, ValidationError> {
        let mut state = self.write();
        let mut snapshot = state.snapshot.clone();
        apply(&mut snapshot);
        snapshot.recompute()?;
        state.snapshot = snapshot.clone();
        state.status = OperationStatus::Succeeded;
        Ok(snapshot)
    }

    fn fail(&self, err: Error, reset_cart: bool) -> Error {
        error!(error = %err, "Cart operation failed");
        let mut state = self.write();
        state.status = OperationStatus::Failed;
        state.error = Some(err.to_string());
        if reset_cart {
            state.snapshot = CartSnapshot::default();
        }
        err
    }

    fn finish<T>(
        &self,
        result: Result<T>,
        apply: impl FnOnce(&mut CartSnapshot, T),
    ) -> Result<CartSnapshot> {
        match result {
            Ok(value) => self
                .succeed(|cart| apply(cart, value))
                .map_err(|err| self.fail(err.into(), false)),
            Err(err) => Err(self.fail(err, false)),
        }
    }

    /// Reject quantities above the known stock level.
    fn check_stock(available: Option<u32>, requested: u32) -> Result<()> {
        match available {
            Some(available) if requested > available => Err(ValidationError::InsufficientStock {
                available,
                requested,
            }
            .into()),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Reload the cart from the backend, fetching product detail for every
    /// line concurrently.
    ///
    /// A missing server cart yields an empty cart. Lines whose product fails
    /// to load are kept with an error marker and zero price.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart itself cannot be read; the local cart is
    /// then reset to empty.
    #[instrument(skip(self, token), fields(user_id = %user))]
    pub async fn fetch_cart(&self, user: &UserId, token: &SecretString) -> Result<CartSnapshot> {
        let _op = self.ops.lock().await;
        self.begin();

        match self.load_lines(user, token).await {
            Ok(lines) => self
                .succeed(|cart| cart.lines = lines)
                .map_err(|err| self.fail(err.into(), true)),
            Err(err) => Err(self.fail(err.into(), true)),
        }
    }

    async fn load_lines(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> std::result::Result<Vec<CartLine>, ApiError> {
        let record = match self.api.get_cart(user, token).await {
            Ok(record) => record,
            Err(ApiError::NotFound(_)) => {
                debug!("No server cart yet");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let items: Vec<CartItemRecord> = record
            .items
            .into_iter()
            .filter(|item| {
                if item.quantity == 0 {
                    warn!(item_id = %item.id, "Skipping cart item with zero quantity");
                }
                item.quantity > 0
            })
            .collect();

        Ok(join_all(items.iter().map(|item| self.line_for(item))).await)
    }

    async fn line_for(&self, item: &CartItemRecord) -> CartLine {
        match self.catalog.fetch_product(&item.product_id).await {
            Ok(product) => CartLine::from_product(&product, item.quantity, Some(item.id.clone())),
            Err(err) => {
                warn!(
                    product_id = %item.product_id,
                    error = %err,
                    "Failed to load product detail for cart line"
                );
                CartLine::placeholder_for(item, err.to_string())
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product.
    ///
    /// Creates the server cart and retries once if it does not exist yet.
    /// When `product` is `None` the detail is fetched; a failed fetch keeps a
    /// placeholder line. Adding a product already in the cart increments its
    /// quantity.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero quantity or one exceeding known
    /// stock, or the backend error. The cart is left unchanged on error.
    #[instrument(skip(self, token, product), fields(user_id = %user, product_id = %product_id))]
    pub async fn add_item(
        &self,
        user: &UserId,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
        product: Option<Product>,
    ) -> Result<CartSnapshot> {
        let _op = self.ops.lock().await;
        self.begin();

        let result = self
            .add_item_remote(user, token, product_id, quantity, product)
            .await;
        self.finish(result, |cart, (item_id, new_line)| {
            if let Some(line) = cart.lines.iter_mut().find(|l| &l.product_id == product_id) {
                line.quantity = line.quantity.saturating_add(quantity);
                if line.cart_item_id.is_none() {
                    line.cart_item_id = item_id;
                }
            } else if let Some(line) = new_line {
                cart.lines.push(line);
            }
        })
    }

    async fn add_item_remote(
        &self,
        user: &UserId,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
        product: Option<Product>,
    ) -> Result<(Option<CartItemId>, Option<CartLine>)> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity.into());
        }

        let existing = self
            .read()
            .snapshot
            .line_for_product(product_id)
            .map(|line| (line.quantity, line.available_quantity));
        let in_cart = existing.map_or(0, |(qty, _)| qty);
        let requested = in_cart
            .checked_add(quantity)
            .ok_or(ValidationError::QuantityTooLarge)?;
        let available = product
            .as_ref()
            .and_then(|p| p.available_quantity)
            .or_else(|| existing.and_then(|(_, available)| available));
        Self::check_stock(available, requested)?;

        let response = self.post_item(user, token, product_id, quantity).await?;

        if existing.is_some() {
            return Ok((response.item_id, None));
        }

        let line = match product {
            Some(product) => CartLine::from_product(&product, quantity, response.item_id.clone()),
            None => match self.catalog.fetch_product(product_id).await {
                Ok(product) => {
                    CartLine::from_product(&product, quantity, response.item_id.clone())
                }
                Err(err) => {
                    warn!(error = %err, "Failed to load product detail for new cart line");
                    CartLine::placeholder(
                        product_id.clone(),
                        response.item_id.clone(),
                        None,
                        quantity,
                        err.to_string(),
                    )
                }
            },
        };

        Ok((response.item_id, Some(line)))
    }

    /// POST the item, creating the cart and retrying once when it is missing.
    async fn post_item(
        &self,
        user: &UserId,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> std::result::Result<AddItemResponse, ApiError> {
        match self
            .api
            .add_cart_item(user, token, product_id, quantity)
            .await
        {
            Err(ApiError::NotFound(_)) => {
                debug!("Cart missing, creating it before retrying");
                self.api.create_cart(user, token).await?;
                self.api
                    .add_cart_item(user, token, product_id, quantity)
                    .await
            }
            other => other,
        }
    }

    /// Set the exact quantity of a line.
    ///
    /// `item_id` is matched against cart-item ids first, then product ids.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero quantity or one exceeding known
    /// stock, or the backend error. The cart is left unchanged on error.
    #[instrument(skip(self, token), fields(user_id = %user, item_id = %item_id))]
    pub async fn update_quantity(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        let _op = self.ops.lock().await;
        self.begin();

        let result = self.update_remote(user, token, item_id, quantity).await;
        self.finish(result, |cart, ()| {
            if let Some(line) = cart
                .line_index(item_id)
                .and_then(|index| cart.lines.get_mut(index))
            {
                line.quantity = quantity;
            }
        })
    }

    async fn update_remote(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
        quantity: u32,
    ) -> Result<()> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity.into());
        }

        let (key, available) = {
            let state = self.read();
            state.snapshot.find_line(item_id).map_or_else(
                || (item_id.to_string(), None),
                |line| (line.item_key().to_string(), line.available_quantity),
            )
        };
        Self::check_stock(available, quantity)?;

        self.api
            .update_cart_item(user, token, &key, quantity)
            .await?;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the cart is left unchanged.
    #[instrument(skip(self, token), fields(user_id = %user, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        user: &UserId,
        token: &SecretString,
        item_id: &str,
    ) -> Result<CartSnapshot> {
        let _op = self.ops.lock().await;
        self.begin();

        let key = self
            .read()
            .snapshot
            .find_line(item_id)
            .map_or_else(|| item_id.to_string(), |line| line.item_key().to_string());

        let result = self
            .api
            .remove_cart_item(user, token, &key)
            .await
            .map_err(Error::from);
        self.finish(result, |cart, ()| {
            if let Some(index) = cart.line_index(item_id) {
                cart.lines.remove(index);
            }
        })
    }

    /// Delete the server cart and reset to empty.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the cart is left unchanged.
    #[instrument(skip(self, token), fields(user_id = %user))]
    pub async fn clear_cart(&self, user: &UserId, token: &SecretString) -> Result<CartSnapshot> {
        let _op = self.ops.lock().await;
        self.begin();

        let result = self.api.delete_cart(user, token).await.map_err(Error::from);
        self.finish(result, |cart, ()| *cart = CartSnapshot::default())
    }

    /// Apply a coupon; the backend decides the discount amount.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank code or the backend error. The
    /// cart is left unchanged on error.
    #[instrument(skip(self, token), fields(user_id = %user))]
    pub async fn apply_coupon(
        &self,
        user: &UserId,
        token: &SecretString,
        code: &str,
    ) -> Result<CartSnapshot> {
        let _op = self.ops.lock().await;
        self.begin();

        let code = code.trim();
        let result = if code.is_empty() {
            Err(ValidationError::EmptyCouponCode.into())
        } else {
            self.api
                .apply_coupon(user, token, code)
                .await
                .map_err(Error::from)
        };
        self.finish(result, |cart, response| {
            cart.applied_coupon = Some(response.coupon.unwrap_or_else(|| code.to_string()));
            cart.discount_amount = response.discount;
        })
    }
}
