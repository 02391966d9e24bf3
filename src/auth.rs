//! Authorization state and API key selection.
//!
//! The orchestrator owns an [`AuthState`] and moves it between three states:
//! `Unauthorized` until a key is selected, `Authorized` while generation is
//! allowed, and `Locked` after a fatal authorization failure until the
//! key-selection flow succeeds again.

use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Unauthorized,
    Authorized,
    Locked,
}

impl AuthState {
    pub fn allows_generation(self) -> bool {
        self == AuthState::Authorized
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthState::Unauthorized => "unauthorized",
            AuthState::Authorized => "authorized",
            AuthState::Locked => "locked",
        };
        f.write_str(label)
    }
}

/// Shared API key. Provider clients read it on every request so a new key
/// takes effect without rebuilding them.
#[derive(Clone, Default)]
pub struct ApiKeyStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl ApiKeyStore {
    pub fn new(key: Option<String>) -> Self {
        let store = Self::default();
        if let Some(key) = key {
            store.set(key);
        }
        store
    }

    /// Store a key; blank keys clear the store.
    pub fn set(&self, key: impl Into<String>) {
        let key = key.into().trim().to_string();
        *self.inner.write() = (!key.is_empty()).then_some(key);
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Key value with all but the last four characters masked.
    pub fn masked(&self) -> Option<String> {
        self.inner.read().as_ref().map(|key| {
            let visible: String = key
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{}", visible)
        })
    }
}

impl fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyStore")
            .field("key", &self.masked())
            .finish()
    }
}

/// The authorization / key-selection flow.
#[async_trait]
pub trait KeySelector: Send + Sync {
    /// Run the flow. `Ok(true)` when a usable key is now in the store;
    /// `Ok(false)` when the user cancelled or no new key is available.
    async fn select_key(&self) -> Result<bool, ApiError>;
}

/// Picks the key up from an environment variable. Re-running it only
/// succeeds when the variable holds a key different from the current one.
pub struct EnvKeySelector {
    store: ApiKeyStore,
    env_var: String,
}

impl EnvKeySelector {
    pub fn new(store: ApiKeyStore, env_var: impl Into<String>) -> Self {
        Self {
            store,
            env_var: env_var.into(),
        }
    }
}

#[async_trait]
impl KeySelector for EnvKeySelector {
    async fn select_key(&self) -> Result<bool, ApiError> {
        let candidate = match std::env::var(&self.env_var) {
            Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => {
                debug!(env_var = %self.env_var, "No API key in environment");
                return Ok(false);
            }
        };
        if self.store.get().as_deref() == Some(candidate.as_str()) {
            debug!(env_var = %self.env_var, "Environment key unchanged; refusing to reuse it");
            return Ok(false);
        }
        self.store.set(candidate);
        info!(env_var = %self.env_var, "API key loaded from environment");
        Ok(true)
    }
}
