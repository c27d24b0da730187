//! Popup coordinator
//!
//! Opens the provider's authorization page in a popup and waits for exactly
//! one of: a matching `SOCIAL_AUTH_SUCCESS`, a matching `SOCIAL_AUTH_ERROR`,
//! the popup deadline, or the user closing the window. The message
//! subscription, the closed-window poll and the deadline all live inside the
//! awaiting future, so every exit path (including dropping the future)
//! releases them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use devassist_domain::{PopupConfig, Provider};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use super::error::{AuthFlowError, AuthFlowResult};
use super::messages::{AuthMessage, MessageBus, WindowMessage};
use super::state::constant_time_eq;
use super::traits::{PopupFeatures, PopupWindow, WindowOpener};
use super::types::AuthorizationGrant;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Drives one popup authorization at a time
pub struct PopupCoordinator {
    opener: Arc<dyn WindowOpener>,
    bus: MessageBus,
    config: PopupConfig,
    pending: AtomicBool,
}

impl PopupCoordinator {
    pub fn new(opener: Arc<dyn WindowOpener>, bus: MessageBus, config: PopupConfig) -> Self {
        Self { opener, bus, config, pending: AtomicBool::new(false) }
    }

    /// Whether an authorization is currently awaiting its popup
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Claim the coordinator for one login attempt
    ///
    /// The claim lasts until the returned reservation is dropped or handed to
    /// [`Self::authorize_reserved`].
    ///
    /// # Errors
    /// `LoginAlreadyInProgress` if another attempt holds the coordinator.
    pub fn reserve(&self) -> AuthFlowResult<LoginReservation<'_>> {
        PendingGuard::acquire(&self.pending).map(LoginReservation).ok_or_else(|| {
            warn!("Rejected login while another is pending");
            AuthFlowError::LoginAlreadyInProgress
        })
    }

    /// Open `url` and wait for the result of the attempt identified by
    /// `provider` and `state`
    ///
    /// # Errors
    /// - `LoginAlreadyInProgress` if another authorization is pending
    /// - `PopupBlocked` if no window could be opened
    /// - `ProviderReportedError`, `CsrfValidationFailed` or
    ///   `MissingAuthorizationCode` when the callback reports an error
    /// - `AuthTimeout` when the deadline passes (the popup is closed)
    /// - `UserCancelled` when the popup is closed before a result arrives
    pub async fn authorize(
        &self,
        provider: Provider,
        state: &str,
        url: &Url,
    ) -> AuthFlowResult<AuthorizationGrant> {
        let reservation = self.reserve()?;
        self.authorize_reserved(reservation, provider, state, url).await
    }

    /// [`Self::authorize`] under a reservation taken earlier with
    /// [`Self::reserve`]
    ///
    /// # Errors
    /// As [`Self::authorize`], except `LoginAlreadyInProgress`.
    pub async fn authorize_reserved(
        &self,
        reservation: LoginReservation<'_>,
        provider: Provider,
        state: &str,
        url: &Url,
    ) -> AuthFlowResult<AuthorizationGrant> {
        let _reservation = reservation;

        // Listen before opening so a fast callback cannot be missed
        let mut messages = self.bus.subscribe();

        let mut features = PopupFeatures::from_config(&self.config);
        if let Some((width, height)) = self.opener.screen_size() {
            features = features.centered_on(width, height);
        }

        let Some(popup) = self.opener.open(url, &format!("{provider}_oauth"), &features) else {
            warn!(provider = %provider, "Authorization popup was blocked");
            return Err(AuthFlowError::PopupBlocked);
        };
        info!(provider = %provider, "Opened authorization popup");

        let result = self.await_outcome(provider, state, popup.as_ref(), &mut messages).await;

        if !popup.is_closed() {
            popup.close();
        }

        match &result {
            Ok(_) => info!(provider = %provider, "Popup authorization succeeded"),
            Err(err) => info!(provider = %provider, error = %err, "Popup authorization failed"),
        }
        result
    }

    async fn await_outcome(
        &self,
        provider: Provider,
        state: &str,
        popup: &dyn PopupWindow,
        messages: &mut Receiver<WindowMessage>,
    ) -> AuthFlowResult<AuthorizationGrant> {
        let deadline = time::sleep(self.config.timeout());
        tokio::pin!(deadline);

        let period = self.config.closed_poll_interval().max(MIN_POLL_INTERVAL);
        let mut closed_poll = time::interval_at(Instant::now() + period, period);
        closed_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                received = messages.recv() => match received {
                    Ok(message) => {
                        if let Some(outcome) = self.interpret(provider, state, &message) {
                            return outcome;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Message listener lagged behind");
                    }
                    Err(RecvError::Closed) => return Err(AuthFlowError::ChannelClosed),
                },

                () = &mut deadline => return Err(AuthFlowError::AuthTimeout),

                _ = closed_poll.tick() => {
                    if popup.is_closed() {
                        return Err(AuthFlowError::UserCancelled);
                    }
                }
            }
        }
    }

    /// Settlement for `message`, or `None` if it belongs to someone else
    fn interpret(
        &self,
        provider: Provider,
        state: &str,
        message: &WindowMessage,
    ) -> Option<AuthFlowResult<AuthorizationGrant>> {
        if message.origin != self.bus.origin() {
            debug!(origin = %message.origin, "Ignoring message from foreign origin");
            return None;
        }

        let Some(parsed) = AuthMessage::parse(&message.data) else {
            debug!("Ignoring message that is not a login result");
            return None;
        };

        match parsed {
            AuthMessage::Success { payload } => {
                if payload.provider != provider
                    || !constant_time_eq(payload.state.as_bytes(), state.as_bytes())
                {
                    debug!(
                        provider = %payload.provider,
                        "Ignoring login result for a different attempt"
                    );
                    return None;
                }
                Some(Ok(AuthorizationGrant { provider, code: payload.code }))
            }
            AuthMessage::Error { error, provider: reported, kind } => {
                if reported.is_some_and(|p| p != provider) {
                    debug!(provider = ?reported, "Ignoring login error for another provider");
                    return None;
                }
                Some(Err(kind.into_flow_error(error)))
            }
        }
    }
}

/// Exclusive claim on a [`PopupCoordinator`]; released on drop
#[must_use = "the claim is released as soon as the reservation is dropped"]
pub struct LoginReservation<'a>(PendingGuard<'a>);

struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok().map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
