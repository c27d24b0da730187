//! Wiring for one application tab
//!
//! [`LoginFlow`] assembles the state store, message bus, login service and
//! session timer from an [`AuthConfig`] and the host's window adapters, so
//! the opener page and the callback page share one tab storage.

use std::sync::Arc;

use devassist_common::auth::{
    AuthBackend, AuthSession, CallbackReceiver, MemorySessionStorage, MessageBus, Navigator,
    OAuthStateStore, OpenerDelivery, OpenerWindow, PopupWindow, RedirectDelivery,
    SessionContext, SessionStorage, SessionTimer, SessionWatch, SocialLoginService, WindowOpener,
};
use devassist_common::time::{Clock, SystemClock};
use devassist_domain::{AuthConfig, DevAssistError, Result};

use crate::http::{HttpAuthBackend, HttpClient};

/// Everything one tab needs to run social logins
pub struct LoginFlow {
    config: AuthConfig,
    storage: Arc<dyn SessionStorage>,
    bus: MessageBus,
    states: Arc<OAuthStateStore>,
    session: Arc<SessionTimer>,
    service: SocialLoginService,
}

impl LoginFlow {
    /// Build a flow backed by the HTTP auth backend at `api_base_url`
    ///
    /// # Errors
    /// Returns `DevAssistError::Config` if the configuration is invalid or
    /// has no `api_base_url`.
    pub fn new(
        config: AuthConfig,
        opener: Arc<dyn WindowOpener>,
        context: Arc<dyn SessionContext>,
    ) -> Result<Self> {
        let api_base = config.api_base_url.as_deref().ok_or_else(|| {
            DevAssistError::Config("api_base_url is required for the auth backend".to_string())
        })?;
        let backend = HttpAuthBackend::new(HttpClient::new()?, api_base)?;

        Self::with_parts(
            config,
            opener,
            context,
            Arc::new(backend),
            Arc::new(MemorySessionStorage::new()),
            Arc::new(SystemClock),
        )
    }

    /// Build a flow from explicit parts
    ///
    /// # Errors
    /// Returns `DevAssistError::Config` if the configuration is invalid.
    pub fn with_parts(
        config: AuthConfig,
        opener: Arc<dyn WindowOpener>,
        context: Arc<dyn SessionContext>,
        backend: Arc<dyn AuthBackend>,
        storage: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let bus = MessageBus::new(config.origin()?);
        let states = Arc::new(OAuthStateStore::new(storage.clone(), clock.clone(), &config.state));
        let session = Arc::new(SessionTimer::new(context, clock, config.session.clone()));
        let service =
            SocialLoginService::new(&config, states.clone(), opener, bus.clone(), backend)?
                .with_session_timer(session.clone());

        tracing::debug!(origin = %bus.origin(), "Login flow assembled");
        Ok(Self { config, storage, bus, states, session, service })
    }

    #[must_use]
    pub fn service(&self) -> &SocialLoginService {
        &self.service
    }

    /// Message bus of the opener window
    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    #[must_use]
    pub fn state_store(&self) -> &Arc<OAuthStateStore> {
        &self.states
    }

    #[must_use]
    pub fn session_timer(&self) -> &Arc<SessionTimer> {
        &self.session
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Callback page handler for this tab
    ///
    /// `opener` is the window that opened the popup, `None` after a
    /// full-page redirect.
    #[must_use]
    pub fn callback_receiver(
        &self,
        opener: Option<Arc<dyn OpenerWindow>>,
        this_window: Arc<dyn PopupWindow>,
        navigator: Arc<dyn Navigator>,
    ) -> CallbackReceiver {
        let origin = self.bus.origin().to_string();
        CallbackReceiver::for_window(
            self.states.clone(),
            opener.map(|opener| OpenerDelivery::new(opener, this_window, origin)),
            RedirectDelivery::new(self.storage.clone(), navigator, self.config.callback.clone()),
        )
    }

    /// Finish a redirect-mode login after the app reloads
    ///
    /// # Errors
    /// See [`SocialLoginService::resume_redirect_login`].
    pub async fn resume_redirect_login(&self) -> Result<Option<AuthSession>> {
        Ok(self.service.resume_redirect_login(self.storage.as_ref()).await?)
    }

    /// Start the background session check loop
    #[must_use]
    pub fn watch_session(&self) -> SessionWatch {
        self.session.spawn()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use devassist_common::auth::{CallbackStatus, SessionPhase};
    use devassist_common::testing::{
        MockNavigator, MockPopupWindow, MockSessionContext, MockWindowOpener,
    };
    use devassist_domain::{Provider, ProviderConfig};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const ORIGIN: &str = "https://app.devassist.pro";

    fn config(api_base: Option<String>) -> AuthConfig {
        let mut config = AuthConfig::new(ORIGIN)
            .with_provider(Provider::Google, ProviderConfig::new("google-client"));
        config.api_base_url = api_base;
        config
    }

    #[test]
    fn test_new_requires_api_base_url() {
        let result = LoginFlow::new(
            config(None),
            Arc::new(MockWindowOpener::new()),
            Arc::new(MockSessionContext::new()),
        );
        assert!(matches!(result, Err(DevAssistError::Config(msg)) if msg.contains("api_base_url")));
    }

    #[test]
    fn test_new_rejects_invalid_origin() {
        let mut config = config(Some("https://api.devassist.pro".to_string()));
        config.app_origin = "not a url".to_string();
        let result = LoginFlow::new(
            config,
            Arc::new(MockWindowOpener::new()),
            Arc::new(MockSessionContext::new()),
        );
        assert!(matches!(result, Err(DevAssistError::Config(_))));
    }

    /// Validates `LoginFlow` behavior for the popup login scenario against
    /// an HTTP backend.
    ///
    /// Assertions:
    /// - Confirms the callback page's code reaches the backend.
    /// - Confirms the session timer starts from the backend's `expiresIn`.
    /// - Confirms the popup is closed and the state consumed.
    #[tokio::test]
    async fn test_popup_login_through_http_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/oauth/google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "user": {"id": 1},
                "token": "jwt",
                "expiresIn": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let opener = Arc::new(MockWindowOpener::new());
        let flow = Arc::new(
            LoginFlow::new(
                config(Some(server.uri())),
                opener.clone(),
                Arc::new(MockSessionContext::new()),
            )
            .unwrap(),
        );

        let login = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.service().login(Provider::Google).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let state = flow.state_store().pending(Provider::Google).unwrap().state;
        let popup = opener.last_popup().unwrap();
        let receiver = flow.callback_receiver(
            Some(Arc::new(flow.bus().port(ORIGIN))),
            popup.clone(),
            Arc::new(MockNavigator::new()),
        );
        receiver.handle(&format!("/auth/callback/google?code=xyz&state={state}")).await.unwrap();

        let session = login.await.unwrap().unwrap();
        assert_eq!(session.token, "jwt");
        assert!(popup.is_closed());
        assert!(flow.state_store().pending(Provider::Google).is_none());
        assert_eq!(flow.session_timer().phase(), SessionPhase::Active);
        assert!(matches!(receiver.current_status(), CallbackStatus::Success(_)));
    }

    #[tokio::test]
    async fn test_resume_redirect_login_reports_stored_error() {
        let server = MockServer::start().await;
        let mut config = config(Some(server.uri()));
        config.callback.recovery_delay_ms = 0;
        let flow = LoginFlow::new(
            config,
            Arc::new(MockWindowOpener::new()),
            Arc::new(MockSessionContext::new()),
        )
        .unwrap();

        assert!(flow.resume_redirect_login().await.unwrap().is_none());

        let state = flow.state_store().issue(Provider::Google).unwrap();
        let navigator = Arc::new(MockNavigator::new());
        let receiver =
            flow.callback_receiver(None, Arc::new(MockPopupWindow::new()), navigator.clone());

        let outcome = receiver
            .handle(&format!(
                "/auth/callback/google?error=access_denied&error_description=Denied&state={state}"
            ))
            .await
            .unwrap();
        assert!(outcome.result.is_err());
        assert_eq!(navigator.routes(), vec!["/login".to_string()]);

        let err = flow.resume_redirect_login().await.unwrap_err();
        assert!(matches!(err, DevAssistError::Auth(msg) if msg.contains("Denied")));
        assert!(flow.resume_redirect_login().await.unwrap().is_none(), "result is single-use");
    }
}
