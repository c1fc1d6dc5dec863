//! The request dispatcher: one HTTP call, decorated with the current
//! access token.

use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use campus_core::SessionState;
use reqwest::{Client, ClientBuilder, Method, header};

use crate::error::ClientError;

const DEFAULT_USER_AGENT: &str = "campus-client/0.1.0";
#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP dispatcher for the Campus API.
///
/// Sends exactly one request per call: no retries, no refresh logic. That
/// policy lives in the session layer. The access token is read from the
/// shared [`SessionState`] at request build time, so a token swapped in by
/// the refresh coordinator is picked up by the replay without rebuilding
/// the client.
#[derive(Clone)]
pub struct CampusClient {
    http: Client,
    base_url: String,
    state: Arc<SessionState>,
}

impl CampusClient {
    pub fn builder() -> CampusClientBuilder {
        CampusClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared session state this dispatcher reads its bearer token from.
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Request builder for an authenticated endpoint. Without an access
    /// token the request goes out unauthenticated and the server answers
    /// with 401.
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match self.state.current().access_token {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    /// Request builder that never attaches credentials (login, register,
    /// token refresh).
    pub fn request_public(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Send and decode a JSON response, mapping failures to
    /// [`ClientError`].
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, &body))
        }
    }

    /// Send a request whose response body is irrelevant (logout, delete).
    pub async fn execute_empty(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(), ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, &body))
        }
    }
}

/// Builder for [`CampusClient`].
#[derive(Default)]
pub struct CampusClientBuilder {
    base_url: Option<String>,
    #[cfg(not(target_arch = "wasm32"))]
    timeout: Option<Duration>,
    user_agent: Option<String>,
    state: Option<Arc<SessionState>>,
}

impl CampusClientBuilder {
    /// Set the base URL (required).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request timeout; an elapsed timeout surfaces as
    /// [`ClientError::Network`] and never enters the refresh path.
    /// Defaults to 10 seconds. Native targets only; in the browser the
    /// runtime owns the timeout.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Share an existing session state instead of starting with an empty
    /// one.
    pub fn session_state(mut self, state: Arc<SessionState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CampusClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let user_agent = self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.into());

        #[cfg(not(target_arch = "wasm32"))]
        let http = ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        #[cfg(target_arch = "wasm32")]
        let http = ClientBuilder::new().user_agent(user_agent).build()?;

        Ok(CampusClient {
            http,
            base_url,
            state: self.state.unwrap_or_default(),
        })
    }
}
