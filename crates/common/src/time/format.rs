//! Human-readable duration formatting
//!
//! Session warnings show the remaining time to the user; logs use the short
//! form.

use std::time::Duration;

/// Format a duration into a short human-readable string
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use devassist_common::time::format::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(5)), "5s");
/// assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
/// assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m 5s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs == 0 {
        return format!("{}ms", duration.as_millis());
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let components = [(hours, "h"), (minutes, "m"), (seconds, "s")];
    let start_index =
        components.iter().position(|(value, _)| *value > 0).unwrap_or(components.len() - 1);

    components[start_index..]
        .iter()
        .map(|(value, suffix)| format!("{value}{suffix}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a duration as a `MM:SS` countdown, rounding partial seconds up
///
/// ```
/// use std::time::Duration;
///
/// use devassist_common::time::format::format_countdown;
///
/// assert_eq!(format_countdown(Duration::from_secs(240)), "04:00");
/// assert_eq!(format_countdown(Duration::from_millis(59_001)), "01:00");
/// ```
pub fn format_countdown(duration: Duration) -> String {
    let mut total_secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        total_secs += 1;
    }
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Format a duration in whole minutes and seconds for user-facing text
///
/// ```
/// use std::time::Duration;
///
/// use devassist_common::time::format::format_duration_verbose;
///
/// assert_eq!(format_duration_verbose(Duration::from_secs(1)), "1 second");
/// assert_eq!(format_duration_verbose(Duration::from_secs(125)), "2 minutes 5 seconds");
/// ```
pub fn format_duration_verbose(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    let plural = |n: u64| if n == 1 { "" } else { "s" };

    let mut parts = Vec::new();
    if minutes > 0 {
        parts.push(format!("{minutes} minute{}", plural(minutes)));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds} second{}", plural(seconds)));
    }

    parts.join(" ")
}
