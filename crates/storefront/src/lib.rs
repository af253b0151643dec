//! Orebi Storefront client library.
//!
//! Talks to the Orebi commerce backend over REST and keeps client-side
//! state for a shopping session:
//! - [`catalog`] - product listings with a TTL cache and normalization
//! - [`filters`] - category, tag and price-range selection
//! - [`cart`] - server cart mirror with derived totals
//! - [`orders`] / [`payments`] - order placement and payment initiation
//! - [`checkout`] - the cart → order → payment → widget flow
//!
//! [`state::Storefront`] ties the stores together and restores the persisted
//! login and cart on boot.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod filters;
pub mod orders;
pub mod payments;
pub mod persist;
pub mod session;
pub mod state;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use state::Storefront;
