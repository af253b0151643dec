//! Cache types for catalog responses.

use std::sync::Arc;

use orebi_core::ProductId;

use super::{ListingKind, Product};
use crate::api::{Category, Tag};

/// Cache key for listings, products and taxonomies.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Listing(ListingKind),
    Product(ProductId),
    Categories,
    Tags,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
    Categories(Arc<Vec<Category>>),
    Tags(Arc<Vec<Tag>>),
}
