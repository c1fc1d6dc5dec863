//! The session controller: the one component the rest of an application
//! talks to.
//!
//! [`SessionManager`] owns the token pair lifecycle. It populates the
//! persistent store and the in-memory state together on login, routes every
//! authenticated call through the refresh coordinator, and tears the whole
//! session down on logout or refresh failure.

mod refresh;
mod resources;

pub use refresh::RefreshCoordinator;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use campus_core::{
    Session, SessionState, SessionStatus, SessionUpdate, SubscriptionId, TokenStore, UserProfile,
};
#[cfg(not(target_arch = "wasm32"))]
use campus_core::MemoryTokenStore;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::client::CampusClient;
use crate::error::ClientError;
use crate::types::{
    LoginRequest, LoginResponse, LogoutRequest, ProfileImage, ProfileUpdate, RegisterOutcome,
    RegisterRequest, RegisterResponse,
};

const LOGIN_PATH: &str = "/users/login/";
const REGISTER_PATH: &str = "/users/register/";
const LOGOUT_PATH: &str = "/users/logout/";
const PROFILE_PATH: &str = "/users/profile/";

/// Session-managed Campus API client.
///
/// Cheap to clone; clones share one session. Everything network-facing
/// goes through here: pages and services hold a `SessionManager` and
/// nothing else.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    client: CampusClient,
    store: Arc<dyn TokenStore>,
    state: Arc<SessionState>,
    refresh: RefreshCoordinator,
    initialized: AtomicBool,
}

impl SessionManager {
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::default()
    }

    /// The shared session state, for read-only consumers.
    pub fn state(&self) -> &Arc<SessionState> {
        &self.inner.state
    }

    /// Pure read of the session state; no I/O.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.is_authenticated()
    }

    /// Cached profile of the current user, if any.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.state.current().user
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&Session) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.state.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.state.unsubscribe(id);
    }

    /// Reconstruct the session left behind by a previous process lifetime.
    ///
    /// Reads the persistent store; a present access token is validated with
    /// a profile fetch before the session counts as authenticated. The
    /// fetch goes through the normal refresh path, so a stale access token
    /// with a live refresh token still reconstructs. Any validation
    /// failure clears the store.
    ///
    /// Runs at most once per manager; later calls just report the current
    /// authentication flag. Returns whether a session was reconstructed.
    pub async fn init(&self) -> bool {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return self.is_authenticated();
        }

        let stored = self.inner.store.read();
        if stored.access_token.is_none() {
            debug!("no persisted session to restore");
            return false;
        }

        self.inner.state.restore(&stored);
        let epoch = self.inner.state.epoch();
        match self.fetch_profile().await {
            Ok(user) => {
                if self.inner.state.epoch() == epoch {
                    self.inner
                        .store
                        .write(&SessionUpdate::new().user(user.clone()));
                    self.inner.state.set_user_if(epoch, user);
                    info!("session restored from persistent store");
                    true
                } else {
                    false
                }
            }
            Err(err) => {
                warn!(error = %err, "persisted session failed validation, clearing");
                self.inner.store.clear();
                self.inner.state.clear();
                false
            }
        }
    }

    /// Authenticate with email/username and password.
    ///
    /// On success the store and state are populated together and the
    /// profile is returned. A 400/401 maps to
    /// [`ClientError::InvalidCredentials`]; transport failures stay
    /// [`ClientError::Network`].
    pub async fn login(&self, credentials: LoginRequest) -> Result<UserProfile, ClientError> {
        let epoch = self.inner.state.epoch();
        self.inner.state.set_status(SessionStatus::Authenticating);

        let request = self
            .inner
            .client
            .request_public(Method::POST, LOGIN_PATH)
            .json(&credentials);
        match self.inner.client.execute::<LoginResponse>(request).await {
            Ok(response) => {
                self.commit_session(
                    epoch,
                    &response.access_token,
                    &response.refresh_token,
                    &response.user,
                );
                info!(user = %response.user.username, "login succeeded");
                Ok(response.user)
            }
            Err(err) => {
                self.inner.state.settle();
                Err(match err {
                    ClientError::Http {
                        status: 400 | 401,
                        message,
                    } => ClientError::InvalidCredentials(message),
                    other => other,
                })
            }
        }
    }

    /// Register a new account. Password and confirmation are checked
    /// locally before anything goes on the wire.
    ///
    /// Whether the account is immediately usable is the backend's call: a
    /// response carrying a full token pair auto-authenticates exactly like
    /// a login, anything else comes back as
    /// [`RegisterOutcome::RequiresLogin`]. The client never invents a
    /// session from a token-less response.
    pub async fn register(
        &self,
        new_user: RegisterRequest,
    ) -> Result<RegisterOutcome, ClientError> {
        if new_user.password != new_user.password_confirm {
            return Err(ClientError::Validation(
                "password and confirmation do not match".into(),
            ));
        }

        let epoch = self.inner.state.epoch();
        let request = self
            .inner
            .client
            .request_public(Method::POST, REGISTER_PATH)
            .json(&new_user);
        let response: RegisterResponse = self.inner.client.execute(request).await?;

        match (response.access_token, response.refresh_token) {
            (Some(access), Some(refresh)) => {
                self.commit_session(epoch, &access, &refresh, &response.user);
                info!(user = %response.user.username, "registration auto-authenticated");
                Ok(RegisterOutcome::AutoAuthenticated(response.user))
            }
            _ => {
                debug!("registration succeeded, explicit login required");
                Ok(RegisterOutcome::RequiresLogin(response.user))
            }
        }
    }

    /// Tell the backend to drop the refresh token, then clear the local
    /// session. The backend call is best-effort: failure is logged and the
    /// local clear happens regardless. Calling this twice in a row is
    /// harmless.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.inner.state.current().refresh_token {
            let request = self
                .inner
                .client
                .request(Method::POST, LOGOUT_PATH)
                .json(&LogoutRequest { refresh_token });
            if let Err(err) = self.inner.client.execute_empty(request).await {
                warn!(error = %err, "backend logout failed, clearing local session anyway");
            }
        }
        self.inner.store.clear();
        self.inner.state.clear();
        info!("logged out");
    }

    /// Fetch the caller's profile and refresh the cached copy.
    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        let epoch = self.inner.state.epoch();
        let user = self.fetch_profile().await?;
        self.cache_user(epoch, &user);
        Ok(user)
    }

    /// Update the caller's profile: structured fields as JSON, or a
    /// profile image as a multipart upload.
    pub async fn update_profile(
        &self,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ClientError> {
        let epoch = self.inner.state.epoch();
        let user: UserProfile = match update {
            ProfileUpdate::Fields(fields) => {
                self.send_authenticated(move |client| {
                    client.request(Method::PATCH, PROFILE_PATH).json(&fields)
                })
                .await?
            }
            ProfileUpdate::Image(image) => {
                self.send_authenticated(move |client| {
                    client
                        .request(Method::PATCH, PROFILE_PATH)
                        .multipart(image_form(&image))
                })
                .await?
            }
        };
        self.cache_user(epoch, &user);
        Ok(user)
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ClientError> {
        self.send_authenticated(|client| client.request(Method::GET, PROFILE_PATH))
            .await
    }

    /// Persist and publish a fresh token pair + profile. Store first, then
    /// state, so subscribers observe a world where both already agree. A
    /// logout that landed after `epoch` was captured wins over the commit.
    fn commit_session(&self, epoch: u64, access: &str, refresh: &str, user: &UserProfile) {
        if self.inner.state.epoch() != epoch {
            debug!("session commit discarded, logout won the race");
            return;
        }
        self.inner.store.write(
            &SessionUpdate::new()
                .access_token(access)
                .refresh_token(refresh)
                .user(user.clone()),
        );
        if !self
            .inner
            .state
            .set_authenticated_if(epoch, access, Some(refresh.to_string()), user.clone())
        {
            self.inner.store.clear();
        }
    }

    fn cache_user(&self, epoch: u64, user: &UserProfile) {
        if self.inner.state.epoch() == epoch {
            self.inner
                .store
                .write(&SessionUpdate::new().user(user.clone()));
            self.inner.state.set_user_if(epoch, user.clone());
        }
    }

    /// Send an authenticated request, transparently resolving one auth
    /// expiry: on a 401 the refresh coordinator is consulted and the
    /// request is replayed exactly once. The attempt counter makes the
    /// one-replay rule explicit; a 401 on the replay surfaces as a plain
    /// HTTP error instead of looping back into the refresh path.
    pub(crate) async fn send_authenticated<T, F>(&self, build: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(&CampusClient) -> reqwest::RequestBuilder,
    {
        let mut attempt: u8 = 0;
        loop {
            let token_at_send = self.inner.state.current().access_token;
            let result = self
                .inner
                .client
                .execute::<T>(build(&self.inner.client))
                .await;
            match result {
                Err(err) if err.is_unauthorized() && attempt == 0 => {
                    attempt += 1;
                    let stale = token_at_send.unwrap_or_default();
                    self.inner
                        .refresh
                        .exchange(
                            &self.inner.client,
                            &self.inner.store,
                            &self.inner.state,
                            &stale,
                        )
                        .await?;
                }
                result => return result,
            }
        }
    }

    /// [`send_authenticated`](Self::send_authenticated) for endpoints whose
    /// response body is ignored.
    pub(crate) async fn send_authenticated_empty<F>(&self, build: F) -> Result<(), ClientError>
    where
        F: Fn(&CampusClient) -> reqwest::RequestBuilder,
    {
        let mut attempt: u8 = 0;
        loop {
            let token_at_send = self.inner.state.current().access_token;
            let result = self
                .inner
                .client
                .execute_empty(build(&self.inner.client))
                .await;
            match result {
                Err(err) if err.is_unauthorized() && attempt == 0 => {
                    attempt += 1;
                    let stale = token_at_send.unwrap_or_default();
                    self.inner
                        .refresh
                        .exchange(
                            &self.inner.client,
                            &self.inner.store,
                            &self.inner.state,
                            &stale,
                        )
                        .await?;
                }
                result => return result,
            }
        }
    }
}

fn image_form(image: &ProfileImage) -> Form {
    let part = Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
    let part = match part.mime_str(&image.content_type) {
        Ok(part) => part,
        // An unparseable content type falls back to the transport default.
        Err(_) => Part::bytes(image.bytes.clone()).file_name(image.file_name.clone()),
    };
    Form::new().part("profile_image", part)
}

/// Builder for [`SessionManager`].
#[derive(Default)]
pub struct SessionManagerBuilder {
    base_url: Option<String>,
    #[cfg(not(target_arch = "wasm32"))]
    timeout: Option<Duration>,
    user_agent: Option<String>,
    store: Option<Arc<dyn TokenStore>>,
}

impl SessionManagerBuilder {
    /// Set the API base URL (required).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request timeout (native targets only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Replace the default token store (in-memory on native targets,
    /// `localStorage` on wasm32).
    pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<SessionManager, ClientError> {
        let state = Arc::new(SessionState::new());

        let mut client_builder = CampusClient::builder().session_state(state.clone());
        if let Some(base_url) = self.base_url {
            client_builder = client_builder.base_url(base_url);
        }
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        }
        let client = client_builder.build()?;

        let store = self.store.unwrap_or_else(default_store);

        Ok(SessionManager {
            inner: Arc::new(ManagerInner {
                client,
                store,
                state,
                refresh: RefreshCoordinator::new(),
                initialized: AtomicBool::new(false),
            }),
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_store() -> Arc<dyn TokenStore> {
    Arc::new(MemoryTokenStore::new())
}

#[cfg(target_arch = "wasm32")]
fn default_store() -> Arc<dyn TokenStore> {
    Arc::new(crate::storage::WebTokenStore::new())
}
