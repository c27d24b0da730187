//! Social login service
//!
//! High-level orchestrator for one browser tab:
//! - issues the CSRF state and builds the authorization URL
//! - runs the popup handshake (or starts a full-page redirect)
//! - forwards the authorization code to the auth backend
//! - starts the session timer for the resulting session

use std::sync::Arc;

use devassist_domain::{AuthConfig, Provider};
use tracing::{info, warn};
use url::Url;

use super::authorize::AuthorizeUrlBuilder;
use super::callback::{RedirectDelivery, StoredOutcome};
use super::error::{AuthFlowError, AuthFlowResult};
use super::messages::MessageBus;
use super::popup::PopupCoordinator;
use super::session::SessionTimer;
use super::state::OAuthStateStore;
use super::storage::SessionStorage;
use super::traits::{AuthBackend, Navigator, WindowOpener};
use super::types::{AuthSession, AuthorizationGrant};

/// Runs social logins for the application window
pub struct SocialLoginService {
    states: Arc<OAuthStateStore>,
    urls: AuthorizeUrlBuilder,
    coordinator: PopupCoordinator,
    backend: Arc<dyn AuthBackend>,
    session: Option<Arc<SessionTimer>>,
}

impl SocialLoginService {
    /// # Errors
    /// Returns `Configuration` if the app origin is invalid.
    pub fn new(
        config: &AuthConfig,
        states: Arc<OAuthStateStore>,
        opener: Arc<dyn WindowOpener>,
        bus: MessageBus,
        backend: Arc<dyn AuthBackend>,
    ) -> AuthFlowResult<Self> {
        Ok(Self {
            states,
            urls: AuthorizeUrlBuilder::new(config)?,
            coordinator: PopupCoordinator::new(opener, bus, config.popup.clone()),
            backend,
            session: None,
        })
    }

    /// Start the session timer after each successful login
    #[must_use]
    pub fn with_session_timer(mut self, timer: Arc<SessionTimer>) -> Self {
        self.session = Some(timer);
        self
    }

    #[must_use]
    pub fn state_store(&self) -> &Arc<OAuthStateStore> {
        &self.states
    }

    #[must_use]
    pub fn is_login_pending(&self) -> bool {
        self.coordinator.is_pending()
    }

    /// Issue a state, open the provider popup and wait for its code
    ///
    /// The coordinator is reserved before the state is issued, so a rejected
    /// concurrent attempt never touches the pending login's state. The issued
    /// state is cleared on every failure.
    ///
    /// # Errors
    /// Any popup or configuration failure; see [`PopupCoordinator::authorize`].
    pub async fn start_login(&self, provider: Provider) -> AuthFlowResult<AuthorizationGrant> {
        let reservation = self.coordinator.reserve()?;

        let state = self.states.issue(provider)?;
        let result = match self.urls.build(provider, &state) {
            Ok(url) => self.coordinator.authorize_reserved(reservation, provider, &state, &url).await,
            Err(err) => Err(err),
        };

        if result.is_err() {
            self.states.clear(provider);
        }
        result
    }

    /// Forward the code to the auth backend and track the new session
    ///
    /// # Errors
    /// Returns `TokenExchangeFailed` if the backend rejects the code.
    pub async fn complete_login(&self, grant: &AuthorizationGrant) -> AuthFlowResult<AuthSession> {
        let session = self.backend.exchange_code(grant.provider, &grant.code).await?;
        info!(provider = %grant.provider, "Social login completed");

        if let Some(timer) = &self.session {
            match session.expires_at {
                Some(expires_at) => timer.start(expires_at).await,
                None => timer.start_from_context().await,
            };
        }
        Ok(session)
    }

    /// Popup login from click to session
    ///
    /// # Errors
    /// See [`start_login`](Self::start_login) and
    /// [`complete_login`](Self::complete_login).
    pub async fn login(&self, provider: Provider) -> AuthFlowResult<AuthSession> {
        let grant = self.start_login(provider).await?;
        self.complete_login(&grant).await
    }

    /// Leave the app for the provider page instead of using a popup
    ///
    /// # Errors
    /// Returns `UnknownProvider` for an unconfigured provider.
    pub fn begin_redirect_login(
        &self,
        provider: Provider,
        navigator: &dyn Navigator,
    ) -> AuthFlowResult<Url> {
        let state = self.states.issue(provider)?;
        let url = self.urls.build(provider, &state).inspect_err(|_| self.states.clear(provider))?;
        info!(provider = %provider, "Redirecting to provider for login");
        navigator.navigate(url.as_str());
        Ok(url)
    }

    /// Finish a redirect login from the result the callback page stored
    ///
    /// Returns `Ok(None)` when there is no stored result.
    ///
    /// # Errors
    /// Returns `ProviderReportedError` with the stored message when the
    /// callback failed, or the backend error when the exchange fails.
    pub async fn resume_redirect_login(
        &self,
        storage: &dyn SessionStorage,
    ) -> AuthFlowResult<Option<AuthSession>> {
        let Some(stored) = RedirectDelivery::take_result(storage) else {
            return Ok(None);
        };

        match (stored.provider, stored.outcome) {
            (Some(provider), StoredOutcome::Success { code }) => {
                let grant = AuthorizationGrant { provider, code };
                self.complete_login(&grant).await.map(Some)
            }
            (_, StoredOutcome::Error { message }) => {
                warn!(message = %message, "Redirect login failed");
                Err(AuthFlowError::ProviderReportedError(message))
            }
            (None, StoredOutcome::Success { .. }) => {
                Err(AuthFlowError::UnknownProvider("missing provider".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::service.
    use std::collections::HashMap;
    use std::time::Duration;

    use devassist_domain::ProviderConfig;

    use super::*;
    use crate::auth::callback::{CallbackReceiver, OpenerDelivery};
    use crate::auth::session::SessionPhase;
    use crate::auth::storage::MemorySessionStorage;
    use crate::testing::{
        Clock, MockAuthBackend, MockClock, MockNavigator, MockSessionContext, MockWindowOpener,
    };

    const ORIGIN: &str = "https://app.devassist.pro";

    struct Harness {
        service: SocialLoginService,
        opener: Arc<MockWindowOpener>,
        bus: MessageBus,
        backend: Arc<MockAuthBackend>,
        storage: Arc<MemorySessionStorage>,
        states: Arc<OAuthStateStore>,
    }

    fn harness(opener: MockWindowOpener) -> Harness {
        let config = AuthConfig::new(ORIGIN)
            .with_provider(Provider::Google, ProviderConfig::new("google-id"))
            .with_provider(Provider::Vk, ProviderConfig::new("vk-id"));
        let storage = Arc::new(MemorySessionStorage::new());
        let clock = MockClock::new();
        let states =
            Arc::new(OAuthStateStore::new(storage.clone(), Arc::new(clock), &config.state));
        let opener = Arc::new(opener);
        let bus = MessageBus::new(ORIGIN);
        let backend = Arc::new(MockAuthBackend::succeeding("jwt-token"));
        let service = SocialLoginService::new(
            &config,
            states.clone(),
            opener.clone(),
            bus.clone(),
            backend.clone(),
        )
        .unwrap();

        Harness { service, opener, bus, backend, storage, states }
    }

    fn state_param(url: &Url) -> String {
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        params["state"].clone()
    }

    /// Validates `SocialLoginService::login` behavior for the popup round
    /// trip scenario.
    ///
    /// Assertions:
    /// - Confirms the callback page's message completes the login.
    /// - Confirms the backend receives the provider and code.
    /// - Confirms the session timer starts in `Active`.
    #[tokio::test(start_paused = true)]
    async fn test_login_round_trip() {
        let h = harness(MockWindowOpener::new());
        let context = Arc::new(MockSessionContext::new());
        let clock = MockClock::new();
        context.set_expires_at(Some(clock.utc_now() + chrono::Duration::hours(1)));
        let timer = Arc::new(SessionTimer::new(
            context.clone(),
            Arc::new(clock),
            devassist_domain::SessionConfig::default(),
        ));
        let service = Arc::new(h.service.with_session_timer(timer.clone()));

        let task = {
            let service = service.clone();
            tokio::spawn(async move { service.login(Provider::Google).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        let url = h.opener.opened_urls().pop().unwrap();
        let state = state_param(&url);
        let popup = h.opener.last_popup().unwrap();
        let receiver = CallbackReceiver::new(
            h.states.clone(),
            Arc::new(OpenerDelivery::new(Arc::new(h.bus.port(ORIGIN)), popup, ORIGIN)),
        );
        receiver.handle(&format!("/auth/callback/google?code=xyz&state={state}")).await.unwrap();

        let session = task.await.unwrap().unwrap();
        assert_eq!(session.token, "jwt-token");
        assert_eq!(h.backend.calls(), vec![(Provider::Google, "xyz".to_string())]);
        assert_eq!(timer.phase(), SessionPhase::Active);
        assert!(h.storage.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_popup_clears_state() {
        let h = harness(MockWindowOpener::blocked());

        let err = h.service.start_login(Provider::Google).await.unwrap_err();

        assert_eq!(err, AuthFlowError::PopupBlocked);
        assert!(h.states.pending(Provider::Google).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_provider_clears_state() {
        let h = harness(MockWindowOpener::new());

        let err = h.service.start_login(Provider::Yandex).await.unwrap_err();

        assert_eq!(err, AuthFlowError::UnknownProvider("yandex".to_string()));
        assert!(h.states.pending(Provider::Yandex).is_none());
        assert_eq!(h.opener.open_count(), 0);
    }

    /// Validates `SocialLoginService::start_login` behavior for the double
    /// click scenario.
    ///
    /// Assertions:
    /// - Confirms the second click is rejected.
    /// - Ensures the pending attempt's state survives the rejection.
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_login_keeps_pending_state() {
        let h = harness(MockWindowOpener::new());

        let service = Arc::new(h.service);
        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.start_login(Provider::Google).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let pending = h.states.pending(Provider::Google).unwrap();

        let err = service.start_login(Provider::Google).await.unwrap_err();
        assert_eq!(err, AuthFlowError::LoginAlreadyInProgress);
        assert_eq!(h.states.pending(Provider::Google).unwrap().state, pending.state);

        first.abort();
    }

    /// Validates `SocialLoginService::start_login` behavior for the racing
    /// clicks scenario.
    ///
    /// Assertions:
    /// - Confirms exactly one of two simultaneous attempts opens a popup.
    /// - Ensures the loser does not overwrite the winner's stored state.
    /// - Confirms the winner's state is cleared once it settles.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_racing_logins_keep_first_state() {
        let h = harness(MockWindowOpener::new());
        let service = Arc::new(h.service);
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let mut attempts: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    service.start_login(Provider::Google).await
                })
            })
            .collect();

        let loser = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(index) = attempts.iter().position(|a| a.is_finished()) {
                    break index;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();
        let loser = attempts.swap_remove(loser);
        let winner = attempts.pop().unwrap();
        assert_eq!(loser.await.unwrap().unwrap_err(), AuthFlowError::LoginAlreadyInProgress);

        tokio::time::timeout(Duration::from_secs(5), async {
            while h.opener.open_count() == 0 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(h.opener.open_count(), 1);
        let url = h.opener.opened_urls().pop().unwrap();
        assert_eq!(h.states.pending(Provider::Google).unwrap().state, state_param(&url));

        h.opener.last_popup().unwrap().simulate_user_close();
        assert_eq!(winner.await.unwrap().unwrap_err(), AuthFlowError::UserCancelled);
        assert!(h.states.pending(Provider::Google).is_none());
    }

    #[tokio::test]
    async fn test_backend_rejection() {
        let h = harness(MockWindowOpener::new());
        h.backend.fail_with("Invalid code");

        let grant = AuthorizationGrant { provider: Provider::Vk, code: "bad".to_string() };
        let err = h.service.complete_login(&grant).await.unwrap_err();

        assert_eq!(err, AuthFlowError::TokenExchangeFailed("Invalid code".to_string()));
    }

    /// Validates `SocialLoginService::resume_redirect_login` behavior for the
    /// full-page redirect scenario.
    ///
    /// Assertions:
    /// - Confirms the stored success is exchanged exactly once.
    /// - Confirms a missing result yields `None`.
    #[tokio::test]
    async fn test_redirect_login_resume() {
        let h = harness(MockWindowOpener::new());
        let navigator = MockNavigator::new();

        let url = h.service.begin_redirect_login(Provider::Vk, &navigator).unwrap();
        assert_eq!(navigator.routes(), vec![url.to_string()]);
        assert!(h.states.pending(Provider::Vk).is_some());

        h.storage.set(
            devassist_domain::constants::SOCIAL_AUTH_RESULT_KEY,
            r#"{"provider":"vk","status":"success","code":"c0de"}"#.to_string(),
        );
        let session = h.service.resume_redirect_login(h.storage.as_ref()).await.unwrap();
        assert!(session.is_some());
        assert_eq!(h.backend.calls(), vec![(Provider::Vk, "c0de".to_string())]);

        assert!(h.service.resume_redirect_login(h.storage.as_ref()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redirect_login_resume_error() {
        let h = harness(MockWindowOpener::new());
        h.storage.set(
            devassist_domain::constants::SOCIAL_AUTH_RESULT_KEY,
            r#"{"provider":"google","status":"error","message":"Login was cancelled."}"#.to_string(),
        );

        let err = h.service.resume_redirect_login(h.storage.as_ref()).await.unwrap_err();
        assert_eq!(err, AuthFlowError::ProviderReportedError("Login was cancelled.".to_string()));
        assert!(h.backend.calls().is_empty());
    }
}
