//! Thin reqwest wrapper for auth API calls
//!
//! Requests are sent exactly once. An authorization code can be redeemed a
//! single time, so the exchange must never be replayed.

use std::time::Duration;

use devassist_domain::DevAssistError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client with a per-request timeout
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with the default timeout and no custom user agent
    ///
    /// # Errors
    /// Returns `DevAssistError::Network` if the TLS backend fails to
    /// initialize.
    pub fn new() -> Result<Self, DevAssistError> {
        Self::builder().build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send `builder` once and return whatever the server answered
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    ///
    /// # Errors
    /// Returns the mapped transport error if the request could not be built
    /// or no response arrived.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, DevAssistError> {
        let request = builder.build().map_err(|err| DevAssistError::from(InfraError::from(err)))?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(DevAssistError::from(InfraError::from(err)))
            }
        }
    }
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, user_agent: None }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// # Errors
    /// Returns `DevAssistError::Network` if reqwest rejects the settings.
    pub fn build(self) -> Result<HttpClient, DevAssistError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| DevAssistError::from(InfraError::from(err)))?;
        Ok(HttpClient { client })
    }
}
