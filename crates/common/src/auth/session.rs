//! Session expiry tracking
//!
//! Recomputes the remaining session time on a fixed poll interval and moves
//! between phases:
//!
//! ```text
//! Idle ──start──► Active ──remaining <= threshold──► Warning ──remaining <= 0──► Expired
//!                   ▲                                   │
//!                   └────────────refresh────────────────┘
//! ```
//!
//! Entering `Expired` logs the user out exactly once. `Expired` is terminal
//! until [`SessionTimer::start`] is called for a fresh login.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use devassist_domain::{DevAssistError, SessionConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::AuthFlowResult;
use super::traits::SessionContext;
use crate::time::{format_countdown, format_duration, format_duration_verbose, Clock};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where the current session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No session is being tracked
    Idle,
    Active,
    /// Within the warning threshold of expiry
    Warning,
    /// Terminal; the user has been logged out
    Expired,
}

impl SessionPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Warning => "warning",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionPhase {
    type Err = DevAssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Idle, Self::Active, Self::Warning, Self::Expired]
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DevAssistError::InvalidInput(format!("Invalid session phase: {s}")))
    }
}

/// Phase for `remaining` time against `threshold`
#[must_use]
pub fn classify(remaining: chrono::Duration, threshold: chrono::Duration) -> SessionPhase {
    if remaining <= chrono::Duration::zero() {
        SessionPhase::Expired
    } else if remaining <= threshold {
        SessionPhase::Warning
    } else {
        SessionPhase::Active
    }
}

#[derive(Debug, Default)]
struct TimerState {
    expires_at: Option<DateTime<Utc>>,
    logged_out: bool,
}

/// Tracks one session's expiry and forces logout when it lapses
pub struct SessionTimer {
    context: Arc<dyn SessionContext>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: Mutex<TimerState>,
    phase: watch::Sender<SessionPhase>,
}

impl SessionTimer {
    pub fn new(context: Arc<dyn SessionContext>, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Idle);
        Self { context, clock, config, state: Mutex::new(TimerState::default()), phase }
    }

    /// Begin tracking a session that expires at `expires_at`
    pub async fn start(&self, expires_at: DateTime<Utc>) -> SessionPhase {
        {
            let mut state = self.state.lock();
            state.expires_at = Some(expires_at);
            state.logged_out = false;
        }
        info!(expires_at = %expires_at, "Session timer started");
        self.tick().await
    }

    /// Begin tracking whatever session the context currently holds
    pub async fn start_from_context(&self) -> SessionPhase {
        match self.context.expires_at().await {
            Some(expires_at) => self.start(expires_at).await,
            None => {
                self.clear();
                SessionPhase::Idle
            }
        }
    }

    /// Stop tracking after an explicit logout
    pub fn clear(&self) {
        *self.state.lock() = TimerState::default();
        self.publish(SessionPhase::Idle);
    }

    /// Extend the session through the context
    ///
    /// An expired session stays expired; the user has to log in again.
    ///
    /// # Errors
    /// Returns the context's error if the refresh is rejected.
    pub async fn refresh(&self) -> AuthFlowResult<SessionPhase> {
        if self.phase() == SessionPhase::Expired {
            debug!("Ignoring refresh for an expired session");
            return Ok(SessionPhase::Expired);
        }

        let expires_at = self.context.refresh().await?;
        self.state.lock().expires_at = Some(expires_at);
        info!(expires_at = %expires_at, "Session refreshed");
        Ok(self.tick().await)
    }

    /// Recompute the phase now, logging out on first expiry
    pub async fn tick(&self) -> SessionPhase {
        let now = self.clock.utc_now();
        let threshold = self.warning_threshold();

        let (phase, logout) = {
            let mut state = self.state.lock();
            let phase = match state.expires_at {
                Some(expires_at) => classify(expires_at - now, threshold),
                None => SessionPhase::Idle,
            };
            let logout = phase == SessionPhase::Expired && !state.logged_out;
            if logout {
                state.logged_out = true;
            }
            (phase, logout)
        };

        self.publish(phase);

        if logout {
            warn!("Session expired, logging out");
            self.context.logout().await;
        }
        phase
    }

    /// Last computed phase
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Phase changes; only transitions are signalled
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// `expires_at - now`; negative once the session has lapsed
    #[must_use]
    pub fn time_until_expiration(&self) -> Option<chrono::Duration> {
        let expires_at = self.state.lock().expires_at?;
        Some(expires_at - self.clock.utc_now())
    }

    /// `MM:SS` countdown while a session is tracked
    #[must_use]
    pub fn countdown(&self) -> Option<String> {
        let remaining = self.time_until_expiration()?;
        Some(format_countdown(remaining.to_std().unwrap_or(Duration::ZERO)))
    }

    /// Banner text while in the warning window
    #[must_use]
    pub fn warning_message(&self) -> Option<String> {
        if self.phase() != SessionPhase::Warning {
            return None;
        }
        let remaining = self.time_until_expiration()?.to_std().ok()?;
        Some(format!("Your session expires in {}.", format_duration_verbose(remaining)))
    }

    /// Poll until `cancel` fires
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.config.poll_interval().max(MIN_POLL_INTERVAL);
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = %format_duration(period), "Session timer polling");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        debug!("Session timer stopped");
    }

    /// Run the poll loop on the tokio runtime
    #[must_use]
    pub fn spawn(self: &Arc<Self>) -> SessionWatch {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).run(cancel.clone()));
        SessionWatch { cancel, handle }
    }

    fn warning_threshold(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.warning_threshold())
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)))
    }

    fn publish(&self, phase: SessionPhase) {
        let changed = self.phase.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
        if changed {
            info!(phase = %phase, "Session phase changed");
        }
    }
}

/// Handle to a spawned poll loop
#[derive(Debug)]
pub struct SessionWatch {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionWatch {
    /// Stop polling and wait for the loop to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            warn!(error = %err, "Session timer task ended abnormally");
        }
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::session.
    use chrono::TimeZone;

    use super::*;
    use crate::auth::error::AuthFlowError;
    use crate::testing::{MockClock, MockSessionContext};

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn timer(context: Arc<MockSessionContext>, clock: &MockClock) -> Arc<SessionTimer> {
        Arc::new(SessionTimer::new(context, Arc::new(clock.clone()), SessionConfig::default()))
    }

    #[test]
    fn test_classify_boundaries() {
        let threshold = chrono::Duration::minutes(5);
        assert_eq!(classify(chrono::Duration::minutes(6), threshold), SessionPhase::Active);
        assert_eq!(classify(chrono::Duration::minutes(5), threshold), SessionPhase::Warning);
        assert_eq!(classify(chrono::Duration::seconds(1), threshold), SessionPhase::Warning);
        assert_eq!(classify(chrono::Duration::zero(), threshold), SessionPhase::Expired);
        assert_eq!(classify(chrono::Duration::seconds(-1), threshold), SessionPhase::Expired);
    }

    /// Validates `SessionTimer::start` behavior for the four minutes left
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the phase is `Warning` with a five minute threshold.
    /// - Confirms the countdown and banner reflect the remaining time.
    #[tokio::test]
    async fn test_warning_inside_threshold() {
        let clock = MockClock::at(start_time());
        let context = Arc::new(MockSessionContext::new());
        let timer = timer(context.clone(), &clock);

        let phase = timer.start(start_time() + chrono::Duration::minutes(4)).await;

        assert_eq!(phase, SessionPhase::Warning);
        assert_eq!(timer.countdown().as_deref(), Some("04:00"));
        assert_eq!(timer.warning_message().as_deref(), Some("Your session expires in 4 minutes."));
        assert_eq!(context.logout_count(), 0);
    }

    /// Validates `SessionTimer::tick` behavior for the already expired
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the phase is `Expired`.
    /// - Confirms logout is invoked exactly once across repeated ticks.
    #[tokio::test]
    async fn test_expired_logs_out_once() {
        let clock = MockClock::at(start_time());
        let context = Arc::new(MockSessionContext::new());
        let timer = timer(context.clone(), &clock);

        let phase = timer.start(start_time() - chrono::Duration::seconds(1)).await;
        assert_eq!(phase, SessionPhase::Expired);

        timer.tick().await;
        timer.tick().await;
        assert_eq!(context.logout_count(), 1);
        assert!(timer.warning_message().is_none());
    }

    #[tokio::test]
    async fn test_refresh_returns_to_active() {
        let clock = MockClock::at(start_time());
        let context = Arc::new(MockSessionContext::new());
        context.set_refresh_result(Ok(start_time() + chrono::Duration::hours(1)));
        let timer = timer(context.clone(), &clock);

        timer.start(start_time() + chrono::Duration::minutes(2)).await;
        assert_eq!(timer.phase(), SessionPhase::Warning);

        assert_eq!(timer.refresh().await.unwrap(), SessionPhase::Active);
        assert_eq!(context.refresh_count(), 1);
    }

    /// Validates `SessionTimer::refresh` behavior for the expired session
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `Expired` is terminal and the context is not asked to
    ///   refresh.
    /// - Confirms a fresh `start` re-arms the logout latch.
    #[tokio::test]
    async fn test_expired_is_terminal_until_start() {
        let clock = MockClock::at(start_time());
        let context = Arc::new(MockSessionContext::new());
        context.set_refresh_result(Ok(start_time() + chrono::Duration::hours(1)));
        let timer = timer(context.clone(), &clock);

        timer.start(start_time()).await;
        assert_eq!(timer.refresh().await.unwrap(), SessionPhase::Expired);
        assert_eq!(context.refresh_count(), 0);

        assert_eq!(timer.start(start_time() + chrono::Duration::hours(1)).await, SessionPhase::Active);
        clock.advance(Duration::from_secs(3600));
        timer.tick().await;
        assert_eq!(context.logout_count(), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let clock = MockClock::at(start_time());
        let context = Arc::new(MockSessionContext::new());
        context.set_refresh_result(Err(AuthFlowError::TokenExchangeFailed("revoked".into())));
        let timer = timer(context.clone(), &clock);

        timer.start(start_time() + chrono::Duration::minutes(3)).await;
        assert_eq!(
            timer.refresh().await,
            Err(AuthFlowError::TokenExchangeFailed("revoked".into()))
        );
        assert_eq!(timer.phase(), SessionPhase::Warning);
    }

    #[tokio::test]
    async fn test_start_from_context_and_clear() {
        let clock = MockClock::at(start_time());
        let context = Arc::new(MockSessionContext::new());
        let timer = timer(context.clone(), &clock);

        assert_eq!(timer.start_from_context().await, SessionPhase::Idle);

        context.set_expires_at(Some(start_time() + chrono::Duration::hours(2)));
        assert_eq!(timer.start_from_context().await, SessionPhase::Active);

        timer.clear();
        assert_eq!(timer.phase(), SessionPhase::Idle);
        assert!(timer.time_until_expiration().is_none());
    }

    /// Validates `SessionTimer::run` behavior for the polling scenario.
    ///
    /// Assertions:
    /// - Confirms the watch channel observes `Active`, then `Warning`, then
    ///   `Expired` as wall time passes.
    /// - Confirms the loop stops when cancelled.
    #[tokio::test(start_paused = true)]
    async fn test_run_loop_publishes_transitions() {
        let clock = MockClock::at(start_time());
        let context = Arc::new(MockSessionContext::new());
        let timer = timer(context.clone(), &clock);
        let mut phases = timer.subscribe();

        timer.start(start_time() + chrono::Duration::minutes(6)).await;
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Active);
        let watch = timer.spawn();

        clock.advance(Duration::from_secs(90));
        time::sleep(Duration::from_secs(31)).await;
        phases.changed().await.unwrap();
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Warning);

        clock.advance(Duration::from_secs(300));
        time::sleep(Duration::from_secs(31)).await;
        phases.changed().await.unwrap();
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Expired);
        assert_eq!(context.logout_count(), 1);

        watch.stop().await;
    }

    #[test]
    fn test_phase_conversions() {
        assert_eq!(SessionPhase::Warning.to_string(), "warning");
        assert_eq!("EXPIRED".parse::<SessionPhase>().unwrap(), SessionPhase::Expired);
        assert!("stale".parse::<SessionPhase>().is_err());
        assert_eq!(serde_json::to_string(&SessionPhase::Active).unwrap(), "\"active\"");
    }
}
