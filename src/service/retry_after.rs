//! Parsing of rate-limit wait hints.

use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use super::constants::MAX_RETRY_AFTER;

/// Parses a `Retry-After` header value.
///
/// Accepts integer seconds or an HTTP-date. Negative values, past dates
/// and garbage yield `None`; anything beyond [`MAX_RETRY_AFTER`] is capped.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tgmedia_core::service::parse_retry_after;
///
/// assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        let Ok(seconds) = u64::try_from(seconds) else {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        };
        return Some(cap_wait(Duration::from_secs(seconds)));
    }

    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        return match datetime.duration_since(SystemTime::now()) {
            Ok(duration) => Some(cap_wait(duration)),
            Err(_) => {
                debug!(header_value, "Retry-After date is in the past, ignoring");
                None
            }
        };
    }

    debug!(header_value, "unparseable Retry-After value");
    None
}

/// Parses the wait suffix of a `FLOOD_WAIT_<seconds>` error code.
#[must_use]
pub fn parse_flood_wait_code(code: &str) -> Option<Duration> {
    code.strip_prefix("FLOOD_WAIT_")
        .and_then(|seconds| seconds.parse::<u64>().ok())
        .map(|seconds| cap_wait(Duration::from_secs(seconds)))
}

/// Caps a requested wait at [`MAX_RETRY_AFTER`].
#[must_use]
pub fn cap_wait(wait: Duration) -> Duration {
    if wait > MAX_RETRY_AFTER {
        warn!(
            requested_secs = wait.as_secs(),
            max_secs = MAX_RETRY_AFTER.as_secs(),
            "rate-limit wait exceeds maximum, capping at 1 hour"
        );
        return MAX_RETRY_AFTER;
    }
    wait
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_negative_is_ignored() {
        assert_eq!(parse_retry_after("-10"), None);
    }

    #[test]
    fn test_parse_retry_after_caps_at_one_hour() {
        assert_eq!(parse_retry_after("999999"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_parse_retry_after_http_date_in_future() {
        let future = SystemTime::now() + Duration::from_secs(120);
        let header = httpdate::fmt_http_date(future);
        let wait = parse_retry_after(&header).unwrap();
        assert!(wait <= Duration::from_secs(120));
        assert!(wait >= Duration::from_secs(100));
    }

    #[test]
    fn test_parse_retry_after_http_date_in_past() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_parse_retry_after_garbage() {
        assert_eq!(parse_retry_after("later"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn test_parse_flood_wait_code() {
        assert_eq!(
            parse_flood_wait_code("FLOOD_WAIT_42"),
            Some(Duration::from_secs(42))
        );
        assert_eq!(parse_flood_wait_code("FLOOD_WAIT"), None);
        assert_eq!(parse_flood_wait_code("FLOOD_WAIT_x"), None);
        assert_eq!(parse_flood_wait_code("FLOOD_WAIT_7200"), Some(MAX_RETRY_AFTER));
    }
}
