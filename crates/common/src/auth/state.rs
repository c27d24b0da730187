//! Single-use CSRF state for the OAuth handshake
//!
//! One outstanding state per provider per tab. Issuing again overwrites the
//! previous value; a successful verification deletes it so a replayed
//! callback can never succeed. A mismatch leaves the stored value untouched.
//!
//! Consumption is a compare-and-remove on the exact stored record, so two
//! concurrent verifications of one state cannot both succeed.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use devassist_domain::constants::OAUTH_STATE_BYTES;
use devassist_domain::{Provider, StateConfig};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{AuthFlowError, AuthFlowResult};
use super::storage::SessionStorage;
use crate::time::Clock;

/// Persisted form of a pending state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthStateRecord {
    pub provider: Provider,
    pub state: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuthStateRecord {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Issues and verifies CSRF tokens bound to a provider
pub struct OAuthStateStore {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new(storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>, config: &StateConfig) -> Self {
        Self { storage, clock, ttl: config.ttl() }
    }

    /// Generate a fresh state for `provider` and store it
    ///
    /// # Errors
    /// Returns `StateGeneration` if the OS random source fails.
    pub fn issue(&self, provider: Provider) -> AuthFlowResult<String> {
        let state = generate_state()?;
        self.insert(provider, state.clone())?;
        info!(provider = %provider, "Issued OAuth state");
        Ok(state)
    }

    /// Store a caller-supplied state, replacing any pending one
    ///
    /// # Errors
    /// Returns `Serialization` if the record cannot be encoded.
    pub fn insert(&self, provider: Provider, state: String) -> AuthFlowResult<()> {
        let issued_at = self.clock.utc_now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AuthFlowError::Configuration(format!("state TTL out of range: {e}")))?;
        let record = OAuthStateRecord { provider, state, issued_at, expires_at: issued_at + ttl };
        self.storage.set(&provider.state_storage_key(), serde_json::to_string(&record)?);
        Ok(())
    }

    /// Consume the pending state iff `candidate` matches it exactly
    pub fn verify(&self, provider: Provider, candidate: &str) -> bool {
        let Some((record, raw)) = self.load(provider) else {
            warn!(provider = %provider, "No pending OAuth state to verify against");
            return false;
        };

        if !constant_time_eq(record.state.as_bytes(), candidate.as_bytes()) {
            warn!(provider = %provider, "OAuth state mismatch");
            return false;
        }

        if self.storage.remove_if(&provider.state_storage_key(), &raw) {
            debug!(provider = %provider, "OAuth state verified and consumed");
            true
        } else {
            warn!(provider = %provider, "OAuth state was consumed or replaced during verification");
            false
        }
    }

    /// [`verify`](Self::verify) as a `Result`
    ///
    /// # Errors
    /// Returns `CsrfValidationFailed` when the state is absent, expired or
    /// does not match.
    pub fn validate(&self, provider: Provider, candidate: &str) -> AuthFlowResult<()> {
        if self.verify(provider, candidate) {
            Ok(())
        } else {
            Err(AuthFlowError::CsrfValidationFailed)
        }
    }

    /// Pending, unexpired record for `provider`
    ///
    /// Expired or unreadable records are removed.
    pub fn pending(&self, provider: Provider) -> Option<OAuthStateRecord> {
        self.load(provider).map(|(record, _)| record)
    }

    /// Live record together with its stored text
    fn load(&self, provider: Provider) -> Option<(OAuthStateRecord, String)> {
        let key = provider.state_storage_key();
        let raw = self.storage.get(&key)?;

        let record = match serde_json::from_str::<OAuthStateRecord>(&raw) {
            Ok(record) if record.provider == provider => record,
            Ok(_) | Err(_) => {
                warn!(provider = %provider, "Discarding malformed OAuth state record");
                self.storage.remove_if(&key, &raw);
                return None;
            }
        };

        if record.is_expired(self.clock.utc_now()) {
            debug!(provider = %provider, "Discarding expired OAuth state");
            self.storage.remove_if(&key, &raw);
            return None;
        }

        Some((record, raw))
    }

    /// Drop the pending state for an abandoned login
    pub fn clear(&self, provider: Provider) {
        if self.storage.remove(&provider.state_storage_key()).is_some() {
            debug!(provider = %provider, "Cleared pending OAuth state");
        }
    }
}

/// Generate a random state token for CSRF protection
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43
/// characters).
///
/// # Errors
/// Returns `StateGeneration` if the OS random source fails.
pub fn generate_state() -> AuthFlowResult<String> {
    let mut bytes = [0u8; OAUTH_STATE_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| AuthFlowError::StateGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Constant-time comparison to prevent timing attacks
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::state.
    use super::*;
    use crate::auth::storage::MemorySessionStorage;
    use crate::testing::MockClock;

    fn store_with_clock() -> (OAuthStateStore, Arc<MemorySessionStorage>, MockClock) {
        let storage = Arc::new(MemorySessionStorage::new());
        let clock = MockClock::new();
        let store =
            OAuthStateStore::new(storage.clone(), Arc::new(clock.clone()), &StateConfig::default());
        (store, storage, clock)
    }

    /// Validates `generate_state` behavior for the entropy scenario.
    ///
    /// Assertions:
    /// - Confirms the token is 43 URL-safe characters (32 bytes).
    /// - Ensures two tokens differ.
    #[test]
    fn test_generate_state() {
        let a = generate_state().unwrap();
        let b = generate_state().unwrap();

        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(a, b);
    }

    /// Validates `OAuthStateStore::verify` behavior for the single-use
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the first verification succeeds for every provider.
    /// - Confirms a replay of the same state fails.
    #[test]
    fn test_verify_is_single_use() {
        let (store, storage, _clock) = store_with_clock();

        for provider in Provider::ALL {
            let state = store.issue(provider).unwrap();
            assert!(store.verify(provider, &state));
            assert!(!store.verify(provider, &state));
        }
        assert!(storage.is_empty());
    }

    /// Validates `OAuthStateStore::verify` behavior for the mismatch scenario.
    ///
    /// Assertions:
    /// - Confirms a wrong token fails without deleting the pending state.
    /// - Confirms the legitimate token still verifies afterwards.
    #[test]
    fn test_mismatch_keeps_pending_state() {
        let (store, _storage, _clock) = store_with_clock();
        let state = store.issue(Provider::Google).unwrap();

        assert!(!store.verify(Provider::Google, "forged"));
        assert!(store.pending(Provider::Google).is_some());
        assert!(store.verify(Provider::Google, &state));
    }

    #[test]
    fn test_states_are_bound_to_provider() {
        let (store, _storage, _clock) = store_with_clock();
        let google = store.issue(Provider::Google).unwrap();

        assert!(!store.verify(Provider::Yandex, &google));
        assert!(store.verify(Provider::Google, &google));
    }

    #[test]
    fn test_issue_overwrites_previous_state() {
        let (store, storage, _clock) = store_with_clock();
        let first = store.issue(Provider::Vk).unwrap();
        let second = store.issue(Provider::Vk).unwrap();

        assert_eq!(storage.len(), 1);
        assert!(!store.verify(Provider::Vk, &first));
        assert!(store.verify(Provider::Vk, &second));
    }

    /// Validates `OAuthStateStore::verify` behavior for the TTL expiry
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a state older than ten minutes never verifies.
    /// - Confirms the expired record is removed from storage.
    #[test]
    fn test_expired_state_never_verifies() {
        let (store, storage, clock) = store_with_clock();
        let state = store.issue(Provider::Google).unwrap();

        clock.advance(Duration::from_secs(600));

        assert!(!store.verify(Provider::Google, &state));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_validate_and_clear() {
        let (store, _storage, _clock) = store_with_clock();
        store.insert(Provider::Yandex, "abc123".to_string()).unwrap();

        assert_eq!(
            store.validate(Provider::Yandex, "nope"),
            Err(AuthFlowError::CsrfValidationFailed)
        );

        store.clear(Provider::Yandex);
        assert!(store.pending(Provider::Yandex).is_none());
        assert_eq!(
            store.validate(Provider::Yandex, "abc123"),
            Err(AuthFlowError::CsrfValidationFailed)
        );
    }

    #[test]
    fn test_malformed_record_is_discarded() {
        let (store, storage, _clock) = store_with_clock();
        storage.set("oauth_state_google", "not json".to_string());

        assert!(store.pending(Provider::Google).is_none());
        assert!(storage.is_empty());
    }

    /// Storage whose reads stall long enough for callers to interleave
    struct SlowReadStorage {
        inner: MemorySessionStorage,
        delay: Duration,
    }

    impl SessionStorage for SlowReadStorage {
        fn get(&self, key: &str) -> Option<String> {
            let value = self.inner.get(key);
            std::thread::sleep(self.delay);
            value
        }

        fn set(&self, key: &str, value: String) {
            self.inner.set(key, value);
        }

        fn remove(&self, key: &str) -> Option<String> {
            self.inner.remove(key)
        }

        fn remove_if(&self, key: &str, expected: &str) -> bool {
            self.inner.remove_if(key, expected)
        }
    }

    /// Validates `OAuthStateStore::verify` behavior for the concurrent
    /// callback scenario.
    ///
    /// Assertions:
    /// - Confirms exactly one of two threads verifying the same state at
    ///   once succeeds, even when both read the record before either
    ///   removes it.
    #[test]
    fn test_concurrent_verify_consumes_once() {
        let storage = Arc::new(SlowReadStorage {
            inner: MemorySessionStorage::new(),
            delay: Duration::from_millis(50),
        });
        let store = OAuthStateStore::new(
            storage.clone(),
            Arc::new(MockClock::new()),
            &StateConfig::default(),
        );
        let state = store.issue(Provider::Google).unwrap();
        let barrier = std::sync::Barrier::new(2);

        let (store, state, barrier) = (&store, state.as_str(), &barrier);

        let successes = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(move || {
                        barrier.wait();
                        store.verify(Provider::Google, state)
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).filter(|ok| *ok).count()
        });

        assert_eq!(successes, 1);
        assert!(storage.inner.is_empty());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
