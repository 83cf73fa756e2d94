use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use mesh_common::settings::BackoffSettings;

/// Per-object exponential backoff for failed reconciliations.
///
/// The n-th consecutive failure of an object waits `initial * 2^(n-1)`,
/// capped at `max`. A successful pass resets the object's count.
#[derive(Debug)]
pub struct ErrorBackoff {
    initial: Duration,
    max: Duration,
    failures: Mutex<HashMap<String, u32>>,
}

impl ErrorBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Records a failure for `key` and returns how long to wait before retrying.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let count = failures.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);

        let factor = 2u32.saturating_pow(*count - 1);
        self.initial.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&self, key: &str) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.remove(key);
    }

    pub fn failures(&self, key: &str) -> u32 {
        let failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.get(key).copied().unwrap_or(0)
    }
}

impl From<&BackoffSettings> for ErrorBackoff {
    fn from(settings: &BackoffSettings) -> Self {
        Self::new(settings.initial(), settings.max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_until_capped() {
        let backoff = ErrorBackoff::new(Duration::from_secs(5), Duration::from_secs(30));

        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay("ns1/demo")).collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(20),
                Duration::from_secs(30),
                Duration::from_secs(30),
            ]
        );
    }

    #[test]
    fn keys_are_tracked_independently() {
        let backoff = ErrorBackoff::new(Duration::from_secs(1), Duration::from_secs(60));

        backoff.next_delay("ns1/a");
        backoff.next_delay("ns1/a");

        assert_eq!(backoff.next_delay("ns1/b"), Duration::from_secs(1));
        assert_eq!(backoff.failures("ns1/a"), 2);
    }

    #[test]
    fn reset_starts_over() {
        let backoff = ErrorBackoff::new(Duration::from_secs(2), Duration::from_secs(60));

        backoff.next_delay("ns1/demo");
        backoff.next_delay("ns1/demo");
        backoff.reset("ns1/demo");

        assert_eq!(backoff.failures("ns1/demo"), 0);
        assert_eq!(backoff.next_delay("ns1/demo"), Duration::from_secs(2));
    }

    #[test]
    fn many_failures_do_not_overflow() {
        let backoff = ErrorBackoff::new(Duration::from_secs(5), Duration::from_secs(300));
        for _ in 0..100 {
            backoff.next_delay("ns1/demo");
        }
        assert_eq!(backoff.next_delay("ns1/demo"), Duration::from_secs(300));
    }
}
