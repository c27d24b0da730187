//! Social login over OAuth 2.0 popups and redirects
//!
//! Client side of the Google / Yandex / VK login handshake. Token exchange
//! happens on the auth backend; this module only obtains the authorization
//! code, protects it with a single-use CSRF state, and hands it over.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ SocialLoginService  │  High-level orchestrator
//! └──────────┬──────────┘
//!            │
//!            ├──► OAuthStateStore      (single-use CSRF state, tab storage)
//!            ├──► AuthorizeUrlBuilder  (provider dialects)
//!            ├──► PopupCoordinator     (popup + message bus, settles once)
//!            ├──► AuthBackend          (code exchange)
//!            └──► SessionTimer         (Active / Warning / Expired)
//!
//! callback page:
//!   CallbackReceiver ──► OpenerDelivery   (postMessage to opener, close)
//!                    └─► RedirectDelivery (store result, navigate)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use devassist_common::auth::{
//!     MemorySessionStorage, MessageBus, OAuthStateStore, SocialLoginService,
//! };
//! use devassist_common::testing::{MockAuthBackend, MockWindowOpener};
//! use devassist_common::time::SystemClock;
//! use devassist_domain::{AuthConfig, Provider, ProviderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::new("https://app.devassist.pro")
//!     .with_provider(Provider::Google, ProviderConfig::new("google-client-id"));
//!
//! let storage = Arc::new(MemorySessionStorage::new());
//! let states = Arc::new(OAuthStateStore::new(storage, Arc::new(SystemClock), &config.state));
//! let bus = MessageBus::new(config.origin()?);
//!
//! let service = SocialLoginService::new(
//!     &config,
//!     states,
//!     Arc::new(MockWindowOpener::new()),
//!     bus,
//!     Arc::new(MockAuthBackend::succeeding("token")),
//! )?;
//!
//! let session = service.login(Provider::Google).await?;
//! println!("Logged in with token {}", session.token);
//! # Ok(())
//! # }
//! ```

pub mod authorize;
pub mod callback;
pub mod error;
pub mod messages;
pub mod popup;
pub mod service;
pub mod session;
pub mod state;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export main types for convenience
pub use authorize::AuthorizeUrlBuilder;
pub use callback::{
    CallbackDelivery, CallbackOutcome, CallbackParams, CallbackReceiver, CallbackStatus,
    CallbackSuccess, OpenerDelivery, RedirectDelivery, StoredCallbackResult, StoredOutcome,
};
pub use error::{AuthFlowError, AuthFlowResult};
pub use messages::{
    AuthErrorKind, AuthMessage, AuthSuccessPayload, MessageBus, MessagePort, WindowMessage,
};
pub use popup::{LoginReservation, PopupCoordinator};
pub use service::SocialLoginService;
pub use session::{classify, SessionPhase, SessionTimer, SessionWatch};
pub use state::{generate_state, OAuthStateRecord, OAuthStateStore};
pub use storage::{MemorySessionStorage, SessionStorage};
pub use traits::{
    AuthBackend, Navigator, OpenerWindow, PopupFeatures, PopupWindow, SessionContext, WindowOpener,
};
pub use types::{AuthSession, AuthorizationGrant, BackendAuthResponse};
