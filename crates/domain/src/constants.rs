//! Application constants
//!
//! Centralized location for the wire-level and timing constants of the social
//! login flow.

// Cross-window message types
pub const MESSAGE_SOCIAL_AUTH_SUCCESS: &str = "SOCIAL_AUTH_SUCCESS";
pub const MESSAGE_SOCIAL_AUTH_ERROR: &str = "SOCIAL_AUTH_ERROR";

// Routes
pub const CALLBACK_ROUTE_PREFIX: &str = "/auth/callback";
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_SUCCESS_ROUTE: &str = "/dashboard";

// Tab-scoped storage keys
pub const OAUTH_STATE_KEY_PREFIX: &str = "oauth_state_";
pub const SOCIAL_AUTH_RESULT_KEY: &str = "social_auth_result";

// Popup coordination
pub const POPUP_TIMEOUT_SECS: u64 = 300;
pub const POPUP_CLOSED_POLL_MS: u64 = 1000;
pub const POPUP_WIDTH: u32 = 500;
pub const POPUP_HEIGHT: u32 = 600;

// CSRF state
pub const OAUTH_STATE_BYTES: usize = 32;
pub const OAUTH_STATE_TTL_SECS: u64 = 600;

// Callback page
pub const CALLBACK_RECOVERY_DELAY_MS: u64 = 3000;

// Session timer
pub const SESSION_POLL_INTERVAL_SECS: u64 = 30;
pub const SESSION_WARNING_THRESHOLD_SECS: u64 = 300;
