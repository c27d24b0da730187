//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory doubles for the login flow's host traits
//! - **[`time`]**: controllable clock
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use devassist_common::testing::{MockClock, MockWindowOpener};
//!
//! let clock = MockClock::new();
//! clock.advance(Duration::from_secs(5));
//!
//! let opener = MockWindowOpener::blocked();
//! assert_eq!(opener.open_count(), 0);
//! ```

pub mod mocks;
pub mod time;

// Re-export commonly used items
pub use mocks::{
    MockAuthBackend, MockNavigator, MockPopupWindow, MockSessionContext, MockSessionStorage,
    MockWindowOpener,
};
pub use time::{Clock, MockClock, SystemClock};
