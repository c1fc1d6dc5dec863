//! In-memory, subscribable mirror of the current session.
//!
//! Replaces the ad hoc module-level token variable of interceptor-style
//! clients: every consumer reads through [`SessionState::current`], and the
//! only writers are the session controller and the refresh coordinator.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::store::StoredSession;
use crate::types::{Session, SessionStatus, UserProfile};

/// Handle returned by [`SessionState::subscribe`]; pass it back to
/// [`SessionState::unsubscribe`] to detach the listener.
pub type SubscriptionId = u64;

type Listener = Box<dyn Fn(&Session) + Send + Sync>;

/// The single in-process source of truth for "who is logged in".
///
/// Listeners run synchronously after every mutation, in subscription order,
/// with the fully-updated snapshot. A listener must not subscribe or
/// unsubscribe from within its callback.
pub struct SessionState {
    current: Mutex<Session>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
    epoch: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Session::default()),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            epoch: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Session {
        self.current.lock().expect("session lock poisoned").clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_authenticated()
    }

    /// Generation counter bumped by every [`clear`](Self::clear).
    ///
    /// Writers that captured the epoch before starting a network call use
    /// the `*_if` mutators to avoid resurrecting a session the user
    /// abandoned mid-flight: logout always wins.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&Session) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Replace the whole session with a freshly authenticated one.
    pub fn set_authenticated(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        user: UserProfile,
    ) {
        let session = Session::authenticated(access_token, refresh_token, user);
        self.mutate(|current| *current = session);
    }

    /// Epoch-guarded variant of [`set_authenticated`](Self::set_authenticated).
    /// Returns `false` (and leaves the state untouched) when a clear
    /// happened after `epoch` was captured.
    pub fn set_authenticated_if(
        &self,
        epoch: u64,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        user: UserProfile,
    ) -> bool {
        let session = Session::authenticated(access_token, refresh_token, user);
        self.mutate_if(epoch, |current| *current = session)
    }

    /// Load a persisted session while its access token is still being
    /// validated. Status is `Authenticating` until the controller settles
    /// it one way or the other.
    pub fn restore(&self, stored: &StoredSession) {
        let session = Session {
            access_token: stored.access_token.clone(),
            refresh_token: stored.refresh_token.clone(),
            user: stored.user.clone(),
            status: SessionStatus::Authenticating,
        };
        self.mutate(|current| *current = session);
    }

    /// Replace only the access token, as a successful refresh does.
    /// Epoch-guarded: a refresh that lost to a concurrent logout is
    /// discarded.
    pub fn set_access_token_if(&self, epoch: u64, token: impl Into<String>) -> bool {
        let token = token.into();
        self.mutate_if(epoch, |current| {
            current.access_token = Some(token);
            current.settle_status();
        })
    }

    /// Replace only the cached profile.
    pub fn set_user(&self, user: UserProfile) {
        self.mutate(|current| {
            current.user = Some(user);
            current.settle_status();
        });
    }

    /// Epoch-guarded variant of [`set_user`](Self::set_user).
    pub fn set_user_if(&self, epoch: u64, user: UserProfile) -> bool {
        self.mutate_if(epoch, |current| {
            current.user = Some(user);
            current.settle_status();
        })
    }

    /// Mark a login or restore as in flight, or settle a failed one back
    /// to `Unauthenticated`.
    pub fn set_status(&self, status: SessionStatus) {
        self.mutate(|current| current.status = status);
    }

    /// Recompute the status from the token/user invariant, e.g. after a
    /// failed login attempt left an `Authenticating` marker behind.
    pub fn settle(&self) {
        self.mutate(Session::settle_status);
    }

    /// Drop the whole session and bump the epoch. Used by logout and by a
    /// failed refresh exchange; wins over any write that started earlier.
    pub fn clear(&self) {
        let snapshot = {
            let mut current = self.current.lock().expect("session lock poisoned");
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *current = Session::default();
            current.clone()
        };
        debug!("session state cleared");
        self.notify(&snapshot);
    }

    fn mutate(&self, f: impl FnOnce(&mut Session)) {
        let snapshot = {
            let mut current = self.current.lock().expect("session lock poisoned");
            f(&mut current);
            current.clone()
        };
        self.notify(&snapshot);
    }

    fn mutate_if(&self, epoch: u64, f: impl FnOnce(&mut Session)) -> bool {
        let snapshot = {
            let mut current = self.current.lock().expect("session lock poisoned");
            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!("stale session write discarded");
                return false;
            }
            f(&mut current);
            current.clone()
        };
        self.notify(&snapshot);
        true
    }

    fn notify(&self, session: &Session) {
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        for (_, listener) in listeners.iter() {
            listener(session);
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
