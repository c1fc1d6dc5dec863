//! `localStorage`-backed token store for browser deployments.

use campus_core::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use campus_core::{SessionUpdate, StoredSession, TokenStore, UserProfile};
use gloo::storage::{LocalStorage, Storage};
use tracing::warn;

/// Persists the session in the browser's `localStorage` under the
/// `access_token` / `refresh_token` / `user` keys, so it survives a page
/// reload. Tabs share the underlying storage; no cross-tab change
/// notification is attempted beyond that.
#[derive(Debug, Default)]
pub struct WebTokenStore;

impl WebTokenStore {
    pub fn new() -> Self {
        Self
    }
}

impl TokenStore for WebTokenStore {
    fn read(&self) -> StoredSession {
        StoredSession {
            access_token: LocalStorage::get::<String>(ACCESS_TOKEN_KEY).ok(),
            refresh_token: LocalStorage::get::<String>(REFRESH_TOKEN_KEY).ok(),
            user: LocalStorage::get::<UserProfile>(USER_KEY).ok(),
        }
    }

    fn write(&self, update: &SessionUpdate) {
        if let Some(token) = &update.access_token {
            if let Err(err) = LocalStorage::set(ACCESS_TOKEN_KEY, token) {
                warn!(error = %err, "failed to persist access token");
            }
        }
        if let Some(token) = &update.refresh_token {
            if let Err(err) = LocalStorage::set(REFRESH_TOKEN_KEY, token) {
                warn!(error = %err, "failed to persist refresh token");
            }
        }
        if let Some(user) = &update.user {
            if let Err(err) = LocalStorage::set(USER_KEY, user) {
                warn!(error = %err, "failed to persist cached profile");
            }
        }
    }

    fn clear(&self) {
        LocalStorage::delete(ACCESS_TOKEN_KEY);
        LocalStorage::delete(REFRESH_TOKEN_KEY);
        LocalStorage::delete(USER_KEY);
    }
}
