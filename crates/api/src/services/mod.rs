//! Business logic between the routes and the store.
//!
//! # Services
//!
//! - `auth` - registration, password login, tokens and the access gate
//! - `catalog` - categories and products
//! - `cart` - per-user cart lines

pub mod auth;
pub mod cart;
pub mod catalog;

pub use auth::{AccessGate, AuthError, AuthService, Registration, TokenError, TokenIssuer};
pub use cart::{CartError, CartService, DecrementOutcome};
pub use catalog::{CatalogError, CatalogService, CategoryDraft, ProductDraft, ProductListing};
