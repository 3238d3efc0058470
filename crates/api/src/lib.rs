//! Shopfloor API library.
//!
//! Accounts, catalog and cart behind a JSON HTTP surface. The binary in
//! `main.rs` wires configuration, tracing and a store into [`app`]; tests
//! build the same router over a [`db::MemoryStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
