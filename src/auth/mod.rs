//! Signed-in session state
//!
//! [`AuthContext`] is the single owner of "who is signed in". It is created
//! once at startup with [`AuthContext::init`], which reads the persisted
//! credentials, and shared by `Arc` with the HTTP client and the command
//! handlers. [`AuthContext::teardown`] is the global logout: it runs on an
//! explicit `logout` and whenever the service rejects the token.

pub mod store;

pub use store::{open_store, CredentialStore, Credentials, FileStore, KeyringStore};

use crate::api::UserProfile;
use crate::error::Result;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared authentication context
pub struct AuthContext {
    store: Box<dyn CredentialStore>,
    current: RwLock<Option<Credentials>>,
}

impl AuthContext {
    /// Build the context from whatever the store holds.
    ///
    /// An unreadable record is treated as signed out so a corrupt file or a
    /// locked keyring never prevents the client from starting.
    pub fn init(store: Box<dyn CredentialStore>) -> Self {
        let current = match store.load() {
            Ok(creds) => creds,
            Err(e) => {
                tracing::warn!("Ignoring unreadable stored credentials: {}", e);
                None
            }
        };
        tracing::debug!(signed_in = current.is_some(), "Auth context initialised");
        Self {
            store,
            current: RwLock::new(current),
        }
    }

    /// `Authorization` header value for the current session, if any
    pub fn authorization_header(&self) -> Option<String> {
        self.read()
            .as_ref()
            .map(Credentials::authorization_header)
    }

    /// Whether a token is present
    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Account details of the current session
    pub fn user(&self) -> Option<UserProfile> {
        self.read().as_ref().and_then(|c| c.user.clone())
    }

    /// Persist and activate new credentials
    pub fn establish(&self, credentials: Credentials) -> Result<()> {
        self.store.save(&credentials)?;
        *self.write() = Some(credentials);
        tracing::info!("Signed in");
        Ok(())
    }

    /// Forget the session locally and in the store.
    ///
    /// In-memory state is cleared even when the store fails, so a rejected
    /// token is never sent again during this run.
    pub fn teardown(&self) -> Result<()> {
        *self.write() = None;
        self.store.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    // Writes replace the whole value, so a poisoned lock still holds a
    // consistent one.
    fn read(&self) -> RwLockReadGuard<'_, Option<Credentials>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Credentials>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}
