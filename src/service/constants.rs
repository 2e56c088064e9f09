//! Constants for remote service access (timeouts, rate limiting).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large payloads).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Maximum honored rate-limit wait (1 hour).
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Wait assumed when the service rate-limits without saying for how long.
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Default gateway address.
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8081";
