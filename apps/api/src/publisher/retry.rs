//! Retry policy for failed publish attempts — the one place that decides
//! whether a failure is re-attempted and when.

use chrono::Duration;

use crate::errors::PublishErrorKind;

/// What happens to a content item after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Eligible for another pass after the delay.
    Retry { delay: Duration },
    /// No further attempts: terminal-business failure or bound exhausted.
    Terminal,
}

/// Decides the disposition for a failure. `retry_count` is the count AFTER
/// this failure has been added.
///
/// Duplicate-content and auth failures are terminal on the first attempt —
/// retrying a duplicate risks another duplicate-detection loop, and an
/// expired session cannot heal itself.
pub fn dispose(kind: PublishErrorKind, retry_count: i32, max_retries: i32, base_secs: i64) -> Disposition {
    if !kind.is_retryable() {
        return Disposition::Terminal;
    }
    if retry_count >= max_retries {
        return Disposition::Terminal;
    }
    Disposition::Retry {
        delay: backoff_delay(retry_count, base_secs),
    }
}

/// Exponential backoff: base * 2^(attempts-1), so the first retry waits one
/// base interval and each later one doubles it.
pub fn backoff_delay(retry_count: i32, base_secs: i64) -> Duration {
    let exponent = (retry_count - 1).clamp(0, 16) as u32;
    Duration::seconds(base_secs.saturating_mul(1 << exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_is_terminal_immediately() {
        assert_eq!(
            dispose(PublishErrorKind::Duplicate, 1, 3, 120),
            Disposition::Terminal
        );
    }

    #[test]
    fn test_auth_is_terminal_immediately() {
        assert_eq!(
            dispose(PublishErrorKind::Auth, 1, 3, 120),
            Disposition::Terminal
        );
    }

    #[test]
    fn test_network_retries_until_bound() {
        assert!(matches!(
            dispose(PublishErrorKind::Network, 1, 3, 120),
            Disposition::Retry { .. }
        ));
        assert!(matches!(
            dispose(PublishErrorKind::Network, 2, 3, 120),
            Disposition::Retry { .. }
        ));
        assert_eq!(
            dispose(PublishErrorKind::Network, 3, 3, 120),
            Disposition::Terminal
        );
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1, 120), Duration::seconds(120));
        assert_eq!(backoff_delay(2, 120), Duration::seconds(240));
        assert_eq!(backoff_delay(3, 120), Duration::seconds(480));
    }

    #[test]
    fn test_backoff_exponent_is_capped() {
        // No overflow for absurd retry counts.
        let d = backoff_delay(i32::MAX, 120);
        assert!(d > Duration::zero());
    }
}
