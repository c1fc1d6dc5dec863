//! Durable storage of the token pair and cached profile.
//!
//! The store is the piece that survives a page reload or process restart.
//! Implementations are synchronous, never perform network I/O, and treat a
//! missing key as `None` rather than an error. Write failures are an
//! implementation concern (logged, not propagated) so callers can treat the
//! store as infallible.

use std::sync::Mutex;

use crate::types::UserProfile;

/// Storage key for the short-lived bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the long-lived refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key for the JSON-serialized cached profile.
pub const USER_KEY: &str = "user";

/// Snapshot of everything a store holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

/// Partial write. Fields left as `None` are untouched by
/// [`TokenStore::write`]; removing keys goes through [`TokenStore::clear`].
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: UserProfile) -> Self {
        self.user = Some(user);
        self
    }
}

/// Durable key/value storage for the session.
pub trait TokenStore: Send + Sync {
    /// Read the full stored session. Missing keys come back as `None`.
    fn read(&self) -> StoredSession;

    /// Merge the update into the stored session and persist it.
    fn write(&self, update: &SessionUpdate);

    /// Remove all session keys.
    fn clear(&self);
}

/// Process-local store: the default on native targets and the workhorse of
/// the test suites. Browser deployments use the `localStorage`-backed store
/// from the client crate instead.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<StoredSession>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated as if left behind by a previous process
    /// lifetime.
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> StoredSession {
        self.inner.lock().expect("token store lock poisoned").clone()
    }

    fn write(&self, update: &SessionUpdate) {
        let mut stored = self.inner.lock().expect("token store lock poisoned");
        if let Some(token) = &update.access_token {
            stored.access_token = Some(token.clone());
        }
        if let Some(token) = &update.refresh_token {
            stored.refresh_token = Some(token.clone());
        }
        if let Some(user) = &update.user {
            stored.user = Some(user.clone());
        }
    }

    fn clear(&self) {
        *self.inner.lock().expect("token store lock poisoned") = StoredSession::default();
    }
}

#[cfg(any(test, feature = "tests"))]
pub mod mock {
    //! mockall double for suites that assert on store interactions.

    use super::{SessionUpdate, StoredSession, TokenStore};

    mockall::mock! {
        pub TokenStore {}

        impl TokenStore for TokenStore {
            fn read(&self) -> StoredSession;
            fn write(&self, update: &SessionUpdate);
            fn clear(&self);
        }
    }
}
