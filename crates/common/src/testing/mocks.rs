//! Mock implementations of the login flow's host traits
//!
//! Each mock records what the flow did to it so tests can assert on opened
//! URLs, navigation, logouts and backend calls.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devassist_domain::Provider;
use url::Url;

use crate::auth::{
    AuthBackend, AuthFlowError, AuthFlowResult, AuthSession, Navigator, PopupFeatures,
    PopupWindow, SessionContext, SessionStorage, WindowOpener,
};

/// Session storage that counts reads and writes
///
/// # Examples
///
/// ```
/// use devassist_common::auth::SessionStorage;
/// use devassist_common::testing::mocks::MockSessionStorage;
///
/// let storage = MockSessionStorage::new();
/// storage.set("key1", "value1".to_string());
///
/// assert_eq!(storage.get("key1"), Some("value1".to_string()));
/// assert_eq!(storage.read_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockSessionStorage {
    data: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MockSessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set` and `remove` calls
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.data.lock().unwrap().keys().cloned().collect()
    }
}

impl SessionStorage for MockSessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.data.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.data.lock().unwrap().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.data.lock().unwrap().remove(key)
    }

    fn remove_if(&self, key: &str, expected: &str) -> bool {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.lock().unwrap();
        if data.get(key).is_some_and(|value| value == expected) {
            data.remove(key);
            true
        } else {
            false
        }
    }
}

/// Popup handle whose `closed` flag the test controls
#[derive(Debug, Default)]
pub struct MockPopupWindow {
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MockPopupWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `closed` as if the user dismissed the window
    pub fn simulate_user_close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of programmatic `close()` calls
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl PopupWindow for MockPopupWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Window opener that records every popup it opens
#[derive(Debug, Default)]
pub struct MockWindowOpener {
    blocked: bool,
    screen: Option<(u32, u32)>,
    opened: Mutex<Vec<(Url, PopupFeatures, Arc<MockPopupWindow>)>>,
}

impl MockWindowOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opener whose popups are always blocked
    pub fn blocked() -> Self {
        Self { blocked: true, ..Self::default() }
    }

    #[must_use]
    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.screen = Some((width, height));
        self
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.opened.lock().unwrap().len()
    }

    #[must_use]
    pub fn opened_urls(&self) -> Vec<Url> {
        self.opened.lock().unwrap().iter().map(|(url, _, _)| url.clone()).collect()
    }

    #[must_use]
    pub fn last_features(&self) -> Option<PopupFeatures> {
        self.opened.lock().unwrap().last().map(|(_, features, _)| *features)
    }

    #[must_use]
    pub fn last_popup(&self) -> Option<Arc<MockPopupWindow>> {
        self.opened.lock().unwrap().last().map(|(_, _, popup)| popup.clone())
    }
}

impl WindowOpener for MockWindowOpener {
    fn open(
        &self,
        url: &Url,
        _name: &str,
        features: &PopupFeatures,
    ) -> Option<Arc<dyn PopupWindow>> {
        if self.blocked {
            return None;
        }
        let popup = Arc::new(MockPopupWindow::new());
        self.opened.lock().unwrap().push((url.clone(), *features, popup.clone()));
        Some(popup as Arc<dyn PopupWindow>)
    }

    fn screen_size(&self) -> Option<(u32, u32)> {
        self.screen
    }
}

/// Router that records navigation targets
#[derive(Debug, Default)]
pub struct MockNavigator {
    routes: Mutex<Vec<String>>,
}

impl MockNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for MockNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

/// Auth context with a settable expiry and refresh result
#[derive(Debug, Default)]
pub struct MockSessionContext {
    expires_at: Mutex<Option<DateTime<Utc>>>,
    refresh_result: Mutex<Option<AuthFlowResult<DateTime<Utc>>>>,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl MockSessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_expires_at(&self, expires_at: Option<DateTime<Utc>>) {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        *self.expires_at.lock().unwrap() = expires_at;
    }

    /// Configure what `refresh` returns
    pub fn set_refresh_result(&self, result: AuthFlowResult<DateTime<Utc>>) {
        *self.refresh_result.lock().unwrap() = Some(result);
    }

    #[must_use]
    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionContext for MockSessionContext {
    async fn expires_at(&self) -> Option<DateTime<Utc>> {
        *self.expires_at.lock().unwrap()
    }

    async fn refresh(&self) -> AuthFlowResult<DateTime<Utc>> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.refresh_result.lock().unwrap().clone().unwrap_or_else(|| {
            Err(AuthFlowError::TokenExchangeFailed("refresh not configured".to_string()))
        });
        if let Ok(expires_at) = &result {
            *self.expires_at.lock().unwrap() = Some(*expires_at);
        }
        result
    }

    async fn logout(&self) {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        *self.expires_at.lock().unwrap() = None;
    }
}

/// Auth backend that issues a fixed token or fails
#[derive(Debug, Default)]
pub struct MockAuthBackend {
    token: String,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<(Provider, String)>>,
}

impl MockAuthBackend {
    /// Backend that accepts every code and returns `token`
    pub fn succeeding(token: impl Into<String>) -> Self {
        Self { token: token.into(), ..Self::default() }
    }

    /// Reject every following exchange with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        *self.failure.lock().unwrap() = Some(message.into());
    }

    /// `(provider, code)` pairs received so far
    #[must_use]
    pub fn calls(&self) -> Vec<(Provider, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn exchange_code(&self, provider: Provider, code: &str) -> AuthFlowResult<AuthSession> {
        self.calls.lock().unwrap().push((provider, code.to_string()));

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(AuthFlowError::TokenExchangeFailed(message));
        }

        Ok(AuthSession {
            user: serde_json::json!({ "provider": provider }),
            token: self.token.clone(),
            refresh_token: None,
            expires_at: None,
        })
    }
}
