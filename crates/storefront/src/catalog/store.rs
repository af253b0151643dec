//! Catalog listings held for display.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use orebi_core::{OperationStatus, ProductId};
use tracing::error;

use super::{CatalogClient, ListingKind, Product, search};
use crate::api::{ApiError, Category, CommerceApi, Tag};
use crate::filters::FilterSelection;

/// Snapshot of everything the catalog store holds.
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    pub new_arrivals: Vec<Product>,
    pub special_offers: Vec<Product>,
    pub best_sellers: Vec<Product>,
    pub all_products: Vec<Product>,
    pub filtered_products: Vec<Product>,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub status: OperationStatus,
    error: Option<RaisedError>,
}

#[derive(Debug, Clone)]
struct RaisedError {
    message: String,
    raised_at: Instant,
}

impl CatalogState {
    fn listing_mut(&mut self, kind: ListingKind) -> &mut Vec<Product> {
        match kind {
            ListingKind::NewArrivals => &mut self.new_arrivals,
            ListingKind::SpecialOffers => &mut self.special_offers,
            ListingKind::BestSellers => &mut self.best_sellers,
            ListingKind::All => &mut self.all_products,
        }
    }
}

/// Catalog listings plus a transient, self-dismissing error.
pub struct CatalogStore<A> {
    client: CatalogClient<A>,
    dismiss_after: Duration,
    state: RwLock<CatalogState>,
}

impl<A: CommerceApi> CatalogStore<A> {
    /// Create a store over `client`; errors stay visible for `dismiss_after`.
    #[must_use]
    pub fn new(client: CatalogClient<A>, dismiss_after: Duration) -> Self {
        Self {
            client,
            dismiss_after,
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// The underlying catalog client.
    #[must_use]
    pub const fn client(&self) -> &CatalogClient<A> {
        &self.client
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> CatalogState {
        self.read().clone()
    }

    /// Current error message, unless it has been dismissed or has expired.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.error_at(Instant::now())
    }

    /// Error message as visible at `now`.
    #[must_use]
    pub fn error_at(&self, now: Instant) -> Option<String> {
        let mut state = self.write();
        let expired = state
            .error
            .as_ref()
            .is_some_and(|raised| now.saturating_duration_since(raised.raised_at) >= self.dismiss_after);
        if expired {
            state.error = None;
        }
        state.error.as_ref().map(|raised| raised.message.clone())
    }

    /// Dismiss the current error immediately.
    pub fn clear_error(&self) {
        self.write().error = None;
    }

    async fn track<T: Clone>(
        &self,
        result: impl Future<Output = Result<T, ApiError>>,
        apply: impl FnOnce(&mut CatalogState, T),
    ) -> Result<T, ApiError> {
        self.write().status = OperationStatus::Loading;

        let result = result.await;

        let mut state = self.write();
        match &result {
            Ok(value) => {
                apply(&mut state, value.clone());
                state.status = OperationStatus::Succeeded;
            }
            Err(err) => {
                error!(error = %err, "Catalog request failed");
                state.status = OperationStatus::Failed;
                state.error = Some(RaisedError {
                    message: err.to_string(),
                    raised_at: Instant::now(),
                });
            }
        }
        result
    }

    /// Load one of the fixed listings into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; the error is also recorded.
    pub async fn load_listing(&self, kind: ListingKind) -> Result<Vec<Product>, ApiError> {
        self.track(self.client.fetch_listing(kind), |state, products| {
            *state.listing_mut(kind) = products;
        })
        .await
    }

    /// Load products matching `selection` into the filtered listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; the error is also recorded.
    pub async fn load_filtered(
        &self,
        selection: &FilterSelection,
    ) -> Result<Vec<Product>, ApiError> {
        self.track(
            self.client.fetch_filtered_products(selection),
            |state, products| state.filtered_products = products,
        )
        .await
    }

    /// Fetch a single product for display.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; the error is also recorded.
    pub async fn load_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.track(self.client.fetch_product(id), |_, _| {}).await
    }

    /// Load all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; the error is also recorded.
    pub async fn load_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.track(self.client.fetch_categories(), |state, categories| {
            state.categories = categories;
        })
        .await
    }

    /// Load all tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; the error is also recorded.
    pub async fn load_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.track(self.client.fetch_tags(), |state, tags| state.tags = tags)
            .await
    }

    /// Search the loaded products: the filtered listing when one is loaded,
    /// otherwise every product.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Product> {
        let state = self.read();
        let pool = if state.filtered_products.is_empty() {
            &state.all_products
        } else {
            &state.filtered_products
        };
        search(pool, query).into_iter().cloned().collect()
    }
}
