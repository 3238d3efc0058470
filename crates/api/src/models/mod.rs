//! Domain models for the API.
//!
//! These are validated domain objects, separate from database row types and
//! from the JSON request/response types in [`crate::routes`].

pub mod cart;
pub mod catalog;
pub mod user;

pub use cart::{CartItem, CartLine, Decremented};
pub use catalog::{Category, NewCategory, NewProduct, Product};
pub use user::{NewUser, User};
