//! Backoff delay calculation for fetch retries and listing-page cycles.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::config::{CrawlingConfig, HttpConfig};

/// Cap on the exponent so long retry chains cannot overflow the delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Delay policy shared by the request executor and the listing extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Base delay (ms) before exponential growth
    pub base_delay_ms: u64,
    /// Additive cycle jitter lower bound (ms)
    pub cycle_jitter_min_ms: u64,
    /// Additive cycle jitter upper bound (ms)
    pub cycle_jitter_max_ms: u64,
}

impl BackoffPolicy {
    pub const fn new(base_delay_ms: u64, cycle_jitter_min_ms: u64, cycle_jitter_max_ms: u64) -> Self {
        Self {
            base_delay_ms,
            cycle_jitter_min_ms,
            cycle_jitter_max_ms,
        }
    }

    /// No delays at all. Used when driving the pipeline against in-memory fetchers.
    pub const fn immediate() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn from_config(http: &HttpConfig, crawling: &CrawlingConfig) -> Self {
        Self::new(
            http.base_delay_ms,
            crawling.cycle_jitter_min_ms,
            crawling.cycle_jitter_max_ms,
        )
    }

    /// Delay before fetch attempt `retry` (0 for the first attempt):
    /// `base * 2^retry * U[0.5, 1.5]`.
    pub fn fetch_delay(&self, retry: u32) -> Duration {
        let exponential = self.exponential_ms(retry);
        // 0.5 ~ 1.5
        let jitter_factor = 0.5 + fastrand::f64();
        Duration::from_millis((exponential as f64 * jitter_factor) as u64)
    }

    /// Delay before listing-page cycle `attempt`:
    /// `base * 2^(attempt-1) + U[min, max]`, zero for the first attempt.
    pub fn cycle_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential = self.exponential_ms(attempt - 1);
        let (low, high) = if self.cycle_jitter_min_ms <= self.cycle_jitter_max_ms {
            (self.cycle_jitter_min_ms, self.cycle_jitter_max_ms)
        } else {
            (self.cycle_jitter_max_ms, self.cycle_jitter_min_ms)
        };
        let jitter = fastrand::u64(low..=high);

        Duration::from_millis(exponential.saturating_add(jitter))
    }

    fn exponential_ms(&self, exponent: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(1_u64 << exponent.min(MAX_BACKOFF_EXPONENT))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default(), &CrawlingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 50, 150)]
    #[case(1, 100, 300)]
    #[case(2, 200, 600)]
    fn fetch_delay_stays_within_jitter_band(#[case] retry: u32, #[case] low: u64, #[case] high: u64) {
        let policy = BackoffPolicy::new(100, 0, 0);
        for _ in 0..50 {
            let delay = policy.fetch_delay(retry).as_millis() as u64;
            assert!(delay >= low && delay <= high, "retry {retry}: {delay}ms");
        }
    }

    #[test]
    fn first_cycle_has_no_delay() {
        let policy = BackoffPolicy::new(2000, 1000, 3000);
        assert_eq!(policy.cycle_delay(0), Duration::ZERO);
    }

    #[rstest]
    #[case(1, 1000, 1100)]
    #[case(2, 2000, 2100)]
    #[case(3, 4000, 4100)]
    fn cycle_delay_is_exponential_plus_additive_jitter(
        #[case] attempt: u32,
        #[case] low: u64,
        #[case] high: u64,
    ) {
        let policy = BackoffPolicy::new(1000, 0, 100);
        for _ in 0..50 {
            let delay = policy.cycle_delay(attempt).as_millis() as u64;
            assert!(delay >= low && delay <= high, "attempt {attempt}: {delay}ms");
        }
    }

    #[test]
    fn immediate_policy_never_sleeps() {
        let policy = BackoffPolicy::immediate();
        for n in 0..5 {
            assert_eq!(policy.fetch_delay(n), Duration::ZERO);
            assert_eq!(policy.cycle_delay(n), Duration::ZERO);
        }
    }

    #[test]
    fn huge_exponents_saturate() {
        let policy = BackoffPolicy::new(u64::MAX / 2, 0, 0);
        assert!(policy.cycle_delay(64) >= Duration::from_millis(u64::MAX / 2));
    }
}
