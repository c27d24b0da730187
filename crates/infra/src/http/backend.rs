//! HTTP client for the DevAssist auth backend
//!
//! The backend performs the provider token exchange; this side only forwards
//! the authorization code:
//!
//! ```text
//! POST {api_base}/auth/oauth/{provider}
//! {"provider": "google", "code": "abc123"}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use devassist_common::auth::{
    AuthBackend, AuthFlowError, AuthFlowResult, AuthSession, BackendAuthResponse,
};
use devassist_common::time::{Clock, SystemClock};
use devassist_domain::{DevAssistError, Provider};
use reqwest::Method;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use super::client::HttpClient;

#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    provider: Provider,
    code: &'a str,
}

/// [`AuthBackend`] that talks to the auth API over HTTP
#[derive(Clone)]
pub struct HttpAuthBackend {
    http: HttpClient,
    api_base: Url,
    clock: Arc<dyn Clock>,
}

impl HttpAuthBackend {
    /// # Errors
    /// Returns `DevAssistError::Config` if `api_base` is not an absolute URL.
    pub fn new(http: HttpClient, api_base: &str) -> Result<Self, DevAssistError> {
        let mut api_base = Url::parse(api_base).map_err(|e| {
            DevAssistError::Config(format!("Invalid auth API base URL '{api_base}': {e}"))
        })?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        Ok(Self { http, api_base, clock: Arc::new(SystemClock) })
    }

    /// Clock used to turn `expiresIn` into an absolute expiry
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Exchange endpoint for a provider
    ///
    /// # Errors
    /// Returns `InvalidUrl` if the endpoint cannot be joined onto the base.
    pub fn endpoint(&self, provider: Provider) -> AuthFlowResult<Url> {
        Ok(self.api_base.join(&format!("auth/oauth/{provider}"))?)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn exchange_code(&self, provider: Provider, code: &str) -> AuthFlowResult<AuthSession> {
        let url = self.endpoint(provider)?;
        let request =
            self.http.request(Method::POST, url).json(&ExchangeRequest { provider, code });

        let response = self.http.send(request).await.map_err(|err| {
            warn!(provider = %provider, error = %err, "Auth backend unreachable");
            AuthFlowError::TokenExchangeFailed(err.to_string())
        })?;

        let status = response.status();
        let body: Option<BackendAuthResponse> = response.json().await.ok();

        if !status.is_success() {
            let message = body
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("Auth backend returned HTTP {}", status.as_u16()));
            warn!(provider = %provider, %status, "Auth backend rejected the authorization code");
            return Err(AuthFlowError::TokenExchangeFailed(message));
        }

        let body = body.ok_or_else(|| {
            AuthFlowError::TokenExchangeFailed("Auth backend returned an invalid response".into())
        })?;

        let session = body.into_session(self.clock.utc_now()).map_err(|message| {
            warn!(provider = %provider, error = %message, "Auth backend reported failure");
            AuthFlowError::TokenExchangeFailed(message)
        })?;

        info!(provider = %provider, "Authorization code exchanged");
        Ok(session)
    }
}
