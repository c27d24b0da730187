//! Time utilities and abstractions
//!
//! - **Clock abstractions**: real and mock time (re-exported from testing)
//! - **[`format`]**: human-readable durations for session countdowns and logs
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use devassist_common::time::{format_duration, MockClock};
//!
//! assert_eq!(format_duration(Duration::from_secs(245)), "4m 5s");
//!
//! let clock = MockClock::new();
//! clock.advance(Duration::from_secs(5));
//! ```

pub mod format;

pub use format::{format_countdown, format_duration, format_duration_verbose};

// Re-export Clock abstractions from testing module
pub use crate::testing::time::{Clock, MockClock, SystemClock};
