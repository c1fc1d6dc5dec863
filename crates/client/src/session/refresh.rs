//! Single-flight coordination of the token refresh exchange.

use std::sync::Arc;

use campus_core::{SessionState, SessionUpdate, TokenStore};
use reqwest::Method;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::CampusClient;
use crate::error::ClientError;
use crate::types::{TokenRefreshRequest, TokenRefreshResponse};

const REFRESH_PATH: &str = "/users/token/refresh/";

/// Serializes refresh exchanges so a burst of concurrently expiring
/// requests performs exactly one `POST /users/token/refresh/`.
///
/// The first caller to observe a 401 takes the flight lock and runs the
/// exchange. Callers that queued behind it re-check the current access
/// token once admitted: if it no longer matches the token they failed
/// with, the exchange already happened and they reuse the result. Some
/// backends rotate the refresh token on first use, so a duplicate
/// exchange would be rejected outright.
pub struct RefreshCoordinator {
    flight: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            flight: Mutex::new(()),
        }
    }

    /// Exchange the refresh token for a new access token after
    /// `stale_token` was rejected. Returns the token to replay with, or
    /// [`ClientError::AuthExpired`] after clearing the session. A 401 on
    /// the refresh call itself is terminal, and so is a network failure
    /// mid-exchange.
    pub(crate) async fn exchange(
        &self,
        client: &CampusClient,
        store: &Arc<dyn TokenStore>,
        state: &SessionState,
        stale_token: &str,
    ) -> Result<String, ClientError> {
        let _flight = self.flight.lock().await;

        // Someone ahead of us in the queue already completed the exchange.
        if let Some(current) = state.current().access_token {
            if current != stale_token {
                debug!("reusing access token refreshed by a concurrent caller");
                return Ok(current);
            }
        }

        let Some(refresh_token) = state.current().refresh_token else {
            warn!("access token rejected with no refresh token held, clearing session");
            store.clear();
            state.clear();
            return Err(ClientError::AuthExpired);
        };

        let epoch = state.epoch();
        debug!("access token rejected, exchanging refresh token");
        let request = client
            .request_public(Method::POST, REFRESH_PATH)
            .json(&TokenRefreshRequest {
                refresh: refresh_token,
            });

        match client.execute::<TokenRefreshResponse>(request).await {
            Ok(renewed) => {
                if state.epoch() != epoch {
                    // A logout landed mid-exchange; it wins.
                    debug!("refresh result discarded, session was cleared mid-exchange");
                    return Err(ClientError::AuthExpired);
                }
                // Store before state, so subscribers observe a world where
                // both already agree.
                store.write(&SessionUpdate::new().access_token(renewed.access.clone()));
                if !state.set_access_token_if(epoch, renewed.access.clone()) {
                    store.clear();
                    return Err(ClientError::AuthExpired);
                }
                debug!("access token refreshed");
                Ok(renewed.access)
            }
            Err(err) => {
                warn!(error = %err, "refresh exchange failed, clearing session");
                store.clear();
                state.clear();
                Err(ClientError::AuthExpired)
            }
        }
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
