//! Product catalog client and store.
//!
//! # Architecture
//!
//! - [`CatalogClient`] performs one GET per operation and normalizes every
//!   product record exactly once
//! - Listings, single products and taxonomies are cached in memory via
//!   `moka`; filtered queries always hit the backend
//! - [`CatalogStore`] keeps the fetched listings for display along with a
//!   transient error that dismisses itself

mod cache;
mod normalize;
mod search;
mod store;

pub use normalize::{DEFAULT_COLOR, NO_DESCRIPTION, Product, UNNAMED_PRODUCT, normalize};
pub use search::search;
pub use store::{CatalogState, CatalogStore};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use orebi_core::ProductId;
use tracing::{debug, instrument, warn};

use crate::api::{ApiError, Category, CommerceApi, ProductQuery, RawProduct, Tag};
use crate::filters::FilterSelection;

use cache::{CacheKey, CacheValue};

/// Maximum number of cached entries.
const CACHE_CAPACITY: u64 = 1000;

/// Fixed product listings offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    NewArrivals,
    SpecialOffers,
    BestSellers,
    All,
}

impl ListingKind {
    /// Backend query for this listing.
    #[must_use]
    pub fn query(self) -> ProductQuery {
        match self {
            Self::NewArrivals => ProductQuery::new_arrivals(),
            Self::SpecialOffers => ProductQuery::special_offers(),
            Self::BestSellers => ProductQuery::best_sellers(),
            Self::All => ProductQuery::default(),
        }
    }
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the product catalog endpoints.
pub struct CatalogClient<A> {
    inner: Arc<CatalogClientInner<A>>,
}

struct CatalogClientInner<A> {
    api: Arc<A>,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl<A> Clone for CatalogClient<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: CommerceApi> CatalogClient<A> {
    /// Create a catalog client. A zero `cache_ttl` disables caching.
    #[must_use]
    pub fn new(api: Arc<A>, cache_ttl: Duration) -> Self {
        let cache = (!cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(cache_ttl)
                .build()
        });

        Self {
            inner: Arc::new(CatalogClientInner { api, cache }),
        }
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        let cache = self.inner.cache.as_ref()?;
        let value = cache.get(key).await;
        if value.is_some() {
            debug!(key = ?key, "Cache hit");
        }
        value
    }

    async fn remember(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    /// Drop every cached response.
    pub fn invalidate(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate_all();
        }
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Fetch one of the fixed listings.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_listing(&self, kind: ListingKind) -> Result<Vec<Product>, ApiError> {
        let key = CacheKey::Listing(kind);
        if let Some(CacheValue::Products(products)) = self.cached(&key).await {
            return Ok(products.as_ref().clone());
        }

        let products = self.fetch_products(&kind.query()).await?;
        self.remember(key, CacheValue::Products(Arc::new(products.clone())))
            .await;
        Ok(products)
    }

    /// Products added during the last week.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn fetch_new_arrivals(&self) -> Result<Vec<Product>, ApiError> {
        self.fetch_listing(ListingKind::NewArrivals).await
    }

    /// Products on special offer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn fetch_special_offers(&self) -> Result<Vec<Product>, ApiError> {
        self.fetch_listing(ListingKind::SpecialOffers).await
    }

    /// Best-selling products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn fetch_best_sellers(&self) -> Result<Vec<Product>, ApiError> {
        self.fetch_listing(ListingKind::BestSellers).await
    }

    /// Every product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn fetch_all_products(&self) -> Result<Vec<Product>, ApiError> {
        self.fetch_listing(ListingKind::All).await
    }

    /// Products matching the current filter selection. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, selection))]
    pub async fn fetch_filtered_products(
        &self,
        selection: &FilterSelection,
    ) -> Result<Vec<Product>, ApiError> {
        self.fetch_products(&selection.to_query()).await
    }

    async fn fetch_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let raw = self.inner.api.get_products(query).await?;
        let total = raw.len();
        let products: Vec<Product> = raw.into_iter().filter_map(normalize).collect();
        if products.len() < total {
            warn!(
                dropped = total - products.len(),
                "Skipped product records without an id"
            );
        }
        Ok(products)
    }

    // =========================================================================
    // Single product and taxonomies
    // =========================================================================

    /// Fetch one product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            return Ok(*product);
        }

        let mut raw: RawProduct = self.inner.api.get_product(id).await?;
        if raw.id.is_none() && raw.document_id.is_none() {
            raw.id = Some(id.clone());
        }
        let product = normalize(raw)
            .ok_or_else(|| ApiError::Decode(format!("Product {id} has no identifier")))?;

        self.remember(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// All product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) = self.cached(&CacheKey::Categories).await
        {
            return Ok(categories.as_ref().clone());
        }

        let categories = self.inner.api.get_categories().await?;
        self.remember(
            CacheKey::Categories,
            CacheValue::Categories(Arc::new(categories.clone())),
        )
        .await;
        Ok(categories)
    }

    /// All product tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_tags(&self) -> Result<Vec<Tag>, ApiError> {
        if let Some(CacheValue::Tags(tags)) = self.cached(&CacheKey::Tags).await {
            return Ok(tags.as_ref().clone());
        }

        let tags = self.inner.api.get_tags().await?;
        self.remember(CacheKey::Tags, CacheValue::Tags(Arc::new(tags.clone())))
            .await;
        Ok(tags)
    }
}
