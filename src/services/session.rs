//! Session context - the single owner of the credential and auth state
//!
//! Constructed once by the composition root and shared (via `Arc`) with the
//! API client and the auth endpoints. Requests only read the token; only
//! `login` and `logout` write it.

use crate::domain::types::User;
use crate::io::token_store::{TokenStore, TokenStoreError};
use parking_lot::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub token: Option<String>,
}

pub struct Session {
    store: Box<dyn TokenStore>,
    state: RwLock<AuthState>,
}

impl Session {
    /// Build a session, restoring the authenticated flag from a persisted token
    pub fn new(store: impl TokenStore + 'static) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "session_restore_failed");
                None
            }
        };
        let state = AuthState { is_authenticated: token.is_some(), user: None, token };
        Self { store: Box::new(store), state: RwLock::new(state) }
    }

    /// Persist the token and mark the session authenticated
    pub fn login(&self, user: User, token: &str) -> Result<(), TokenStoreError> {
        self.store.save(token)?;
        let mut state = self.state.write();
        info!(username = %user.username, "session_login");
        *state = AuthState {
            is_authenticated: true,
            user: Some(user),
            token: Some(token.to_string()),
        };
        Ok(())
    }

    /// Clear the credential and the auth state. Safe to call repeatedly.
    pub fn logout(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "session_token_clear_failed");
        }
        let mut state = self.state.write();
        if state.is_authenticated {
            info!("session_logout");
        }
        *state = AuthState::default();
    }

    /// Current credential, read from persistent storage.
    ///
    /// A store that cannot be read is treated as holding no token.
    pub fn token(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "session_token_read_failed");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.read().clone()
    }
}
