//! Orebi Core - Shared types library.
//!
//! This crate provides the domain value types used across the Orebi
//! storefront client:
//! - `storefront` - REST client, stores and checkout orchestration
//! - `cli` - Command-line driver for the storefront
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, emails, phone numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
