//! Shopfloor Core - Shared domain types.
//!
//! This crate provides the types used across all Shopfloor components:
//! - `api` - The HTTP backend (users, catalog, cart)
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and phone numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
