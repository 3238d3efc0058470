//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::{AccessGate, TokenIssuer};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, the token issuer and the access gate.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
    gate: AccessGate,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration (signing secret, token TTL, admin IDs)
    /// * `store` - `PostgreSQL` or in-memory store
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>) -> Self {
        let tokens = TokenIssuer::new(&config.auth.jwt_secret, config.auth.token_ttl);
        let gate = AccessGate::new(tokens.clone(), config.auth.admin_ids.iter().copied());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                gate,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get a reference to the access gate.
    #[must_use]
    pub fn gate(&self) -> &AccessGate {
        &self.inner.gate
    }
}
