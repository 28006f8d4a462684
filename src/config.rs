use std::time::Duration;

/// Attempts made for a single deduction before contention is reported as failure.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How long SQLite waits on another writer's lock before reporting `BUSY`.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before retry `n` is `n * retry_backoff`.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Tunables for storage access and the credit ledger's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub max_attempts: u32,
    pub busy_timeout: Duration,
    pub retry_backoff: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl LedgerConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        // At least one attempt is always made
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(LedgerConfig::default().with_max_attempts(0).max_attempts, 1);
    }
}
