//! Utility functions for general-purpose use across the application.

use chrono::{DateTime, Duration, Utc};

/// Convert a caller-supplied freshness window in seconds into a duration.
///
/// # Arguments
///
/// * `seconds` - Window length as received in a request
///
/// # Returns
///
/// The window as a `chrono::Duration`, or `None` when it is too large to be
/// represented. Such a window reaches back before any stored check.
///
/// # Examples
///
/// ```
/// use link_checker_api::util::window_from_secs;
///
/// let window = window_from_secs(600).unwrap();
/// assert_eq!(window.num_minutes(), 10);
/// ```
pub fn window_from_secs(seconds: u64) -> Option<Duration> {
    i64::try_from(seconds).ok().and_then(Duration::try_seconds)
}

/// Start of a freshness window ending now.
///
/// Saturates at the earliest representable instant rather than overflowing.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_from_secs() {
        assert_eq!(window_from_secs(0), Some(Duration::zero()));
        assert_eq!(window_from_secs(3600), Some(Duration::hours(1)));
        assert_eq!(window_from_secs(u64::MAX), None);
    }

    #[test]
    fn test_window_start_saturates() {
        let now = Utc::now();
        assert_eq!(window_start(now, Duration::hours(1)), now - Duration::hours(1));
        assert_eq!(window_start(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
