//! Authenticated session and its single-writer store

use crate::auth::Authenticator;
use crate::error::AuthError;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info};

/// Credentials for one household, issued by the identity service
///
/// A session is never mutated. Re-authentication produces a new one that
/// replaces the old reference in the [`SessionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub household_id: String,
    pub access_token: String,
    /// Password for the push broker
    pub push_channel_token: String,
    pub expiry: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
}

impl Session {
    /// Value of the `Cookie` header carrying the access token
    pub fn cookie(&self) -> String {
        format!("ACCESSTOKEN={}", self.access_token)
    }

    /// Whether the session is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|expiry| expiry <= now).unwrap_or(false)
    }
}

/// Holds the current session and serializes re-authentication
///
/// Readers take a cheap `Arc` clone. Concurrent refresh requests that were
/// triggered by the same stale session collapse into one call to the
/// authenticator; the later callers get the session the first one obtained.
pub struct SessionStore {
    current: RwLock<Arc<Session>>,
    refresh_lock: Mutex<()>,
    authenticator: Arc<dyn Authenticator>,
}

impl SessionStore {
    /// Run the initial authorization and hold its session
    pub fn establish(authenticator: Arc<dyn Authenticator>) -> Result<Self, AuthError> {
        let session = authenticator.authorize(None)?;
        info!(household_id = %session.household_id, "Session established");
        Ok(Self::with_session(authenticator, session))
    }

    /// Wrap an already issued session
    pub fn with_session(authenticator: Arc<dyn Authenticator>, session: Session) -> Self {
        Self {
            current: RwLock::new(Arc::new(session)),
            refresh_lock: Mutex::new(()),
            authenticator,
        }
    }

    pub fn current(&self) -> Arc<Session> {
        self.current.read().clone()
    }

    pub fn household_id(&self) -> String {
        self.current.read().household_id.clone()
    }

    /// Replace `stale` with a fresh session
    ///
    /// If another caller already replaced `stale`, that session is returned
    /// and the authenticator is not called again.
    pub fn refresh_after(&self, stale: &Arc<Session>) -> Result<Arc<Session>, AuthError> {
        let _guard = self.refresh_lock.lock();

        let current = self.current();
        if !Arc::ptr_eq(&current, stale) {
            debug!("Session already refreshed by a concurrent caller");
            return Ok(current);
        }

        debug!(household_id = %current.household_id, "Re-authenticating");
        let fresh = Arc::new(self.authenticator.authorize(Some(&current))?);
        *self.current.write() = Arc::clone(&fresh);
        info!(household_id = %fresh.household_id, "Session refreshed");
        Ok(fresh)
    }

    /// Unconditionally replace the current session
    pub fn refresh(&self) -> Result<Arc<Session>, AuthError> {
        let current = self.current();
        self.refresh_after(&current)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("household_id", &self.household_id())
            .finish_non_exhaustive()
    }
}
