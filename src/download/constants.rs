//! Constants for the download module (timeouts, paging).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-fetch timeout budget when none is configured.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Smallest per-fetch timeout budget honoured; lower values are raised to this.
pub const MIN_SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

/// Number of results a single result page yields before more pages are needed.
pub const PAGE_SIZE: u32 = 100;

/// Browser User-Agent sent with every request; the image index rejects
/// unknown agents with a stripped-down page that has no metadata blocks.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/41.0.2228.0 Safari/537.36";

/// Clamps a configured timeout to [`MIN_SOCKET_TIMEOUT`].
#[must_use]
pub fn effective_timeout(configured: Option<Duration>) -> Duration {
    configured
        .unwrap_or(DEFAULT_SOCKET_TIMEOUT)
        .max(MIN_SOCKET_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_timeout_defaults_when_unset() {
        assert_eq!(effective_timeout(None), DEFAULT_SOCKET_TIMEOUT);
    }

    #[test]
    fn test_effective_timeout_raises_small_values() {
        assert_eq!(
            effective_timeout(Some(Duration::from_millis(500))),
            MIN_SOCKET_TIMEOUT
        );
        assert_eq!(
            effective_timeout(Some(Duration::from_secs(30))),
            Duration::from_secs(30)
        );
    }
}
