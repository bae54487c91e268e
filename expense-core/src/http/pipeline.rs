use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::message::{ApiResponse, AuthMode, PendingRequest};
use super::request::Request;
use crate::config::ClientConfig;
use crate::error::ExplorerError;
use crate::session::SessionObserver;
use crate::token::TokenStore;

/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh/";

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Sends every API call: attaches the bearer token and recovers from an
/// expired access token by refreshing it once and re-sending the request.
///
/// Refreshes go through a single gate. A caller that waited on the gate while
/// another caller refreshed picks up the new token instead of refreshing again.
pub struct RequestPipeline {
    config: ClientConfig,
    request: Request,
    tokens: Arc<TokenStore>,
    refresh_gate: tokio::sync::Mutex<()>,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl RequestPipeline {
    /// Creates a pipeline for the API described by `config`.
    #[must_use]
    pub fn new(config: &ClientConfig, tokens: Arc<TokenStore>) -> Self {
        Self {
            config: config.clone(),
            request: Request::new(config),
            tokens,
            refresh_gate: tokio::sync::Mutex::new(()),
            observer: None,
        }
    }

    /// Registers the receiver of the "session expired" signal.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Connection settings in use.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token store the pipeline reads credentials from.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Sends `request` and returns whatever response the server gave, with one
    /// exception: a 401 on a bearer request triggers a token refresh and a
    /// single re-send.
    ///
    /// # Errors
    ///
    /// - [`ExplorerError::NetworkError`] when no response was received.
    /// - [`ExplorerError::SessionExpired`] when the token could not be
    ///   refreshed. The token store has been cleared.
    /// - [`ExplorerError::Unauthorized`] when the re-sent request was rejected
    ///   again. The token store has been cleared.
    pub async fn execute(&self, mut request: PendingRequest) -> Result<ApiResponse, ExplorerError> {
        let token = match request.auth() {
            AuthMode::Bearer => self.tokens.access_token()?,
            AuthMode::Anonymous => None,
        };
        if token.is_none() && request.auth() == AuthMode::Bearer {
            log::debug!("no access token stored, sending {} unauthenticated", request.path());
        }

        let response = self.dispatch(&request, token.as_deref()).await?;
        if response.status() != 401
            || request.auth() == AuthMode::Anonymous
            || request.is_retried()
        {
            return Ok(response);
        }

        log::debug!("{} rejected with 401, refreshing access token", request.path());
        request.mark_retried();
        let fresh = self.refresh_access_token(token.as_deref()).await?;

        let response = self.dispatch(&request, Some(&fresh)).await?;
        if response.status() == 401 {
            self.tear_down("request rejected again after token refresh");
            return Err(ExplorerError::Unauthorized {
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }

    /// Sends `request` and fails on any non-2xx response.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`] and [`ApiResponse::error_for_status`].
    pub async fn execute_checked(
        &self,
        request: PendingRequest,
    ) -> Result<ApiResponse, ExplorerError> {
        self.execute(request).await?.error_for_status()
    }

    async fn dispatch(
        &self,
        request: &PendingRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ExplorerError> {
        let url = self.config.url(request.path());
        let response = self
            .request
            .handle(|| request.apply(self.request.req(request.method().clone(), &url), token))
            .await?;
        ApiResponse::read(response).await
    }

    /// Returns an access token newer than `stale`, refreshing it if nobody
    /// else did while we waited on the gate.
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String, ExplorerError> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.tokens.access_token()? {
            if stale != Some(current.as_str()) {
                log::debug!("access token was refreshed concurrently, reusing it");
                return Ok(current);
            }
        }

        let Some(refresh) = self.tokens.refresh_token()? else {
            return Err(self.end_session("no refresh token stored"));
        };

        match self.request_refresh(&refresh).await {
            Ok(access) => {
                self.tokens.set_access_token(&access)?;
                log::debug!("access token refreshed");
                Ok(access)
            }
            Err(e) => Err(self.end_session(&format!("token refresh failed: {e}"))),
        }
    }

    /// Calls the refresh endpoint directly, bypassing the 401 handling.
    async fn request_refresh(&self, refresh: &str) -> Result<String, ExplorerError> {
        let url = self.config.url(REFRESH_PATH);
        let body = RefreshRequest { refresh };
        let response = self
            .request
            .handle(|| self.request.req(Method::POST, &url).json(&body))
            .await?;
        let response = ApiResponse::read(response).await?.error_for_status()?;
        let refreshed: RefreshResponse = response.json()?;
        Ok(refreshed.access)
    }

    fn end_session(&self, reason: &str) -> ExplorerError {
        self.tear_down(reason);
        ExplorerError::SessionExpired {
            reason: reason.to_string(),
        }
    }

    fn tear_down(&self, reason: &str) {
        log::warn!("ending session: {reason}");
        if let Err(e) = self.tokens.clear() {
            log::warn!("failed to clear stored tokens: {e}");
        }
        if let Some(observer) = &self.observer {
            observer.session_expired(reason);
        }
    }
}

impl fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}
