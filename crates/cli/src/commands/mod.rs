//! Subcommand implementations.
//!
//! Every command that touches the cart first syncs it from the server and
//! persists the login and cart lines when done.

use orebi_storefront::Storefront;
use orebi_storefront::api::HttpApi;

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

/// Storefront wired to the live backend.
pub type Shop = Storefront<HttpApi>;
