//! Randomized delays between page actions and the retry policy for page opens.

use std::time::Duration;

use rand::Rng;

/// Uniform random delay between `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    pub min: Duration,
    pub max: Duration,
}

impl Jitter {
    /// Bounds are swapped when given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn zero() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub async fn wait(&self) {
        if self.is_zero() {
            return;
        }
        let delay = self.sample();
        tracing::trace!("sleeping {:.1}s", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
}

/// Delay policy for one crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// After the search page loads.
    pub search: Jitter,
    /// After each scroll to the bottom of the results.
    pub scroll: Jitter,
    /// After opening a candidate video.
    pub open: Jitter,
    /// After a refresh or a click that loads a new page.
    pub settle: Jitter,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            search: Jitter::secs(5, 10),
            scroll: Jitter::secs(1, 5),
            open: Jitter::secs(2, 5),
            settle: Jitter::secs(5, 10),
        }
    }
}

impl Pacing {
    /// No delays at all. Used by tests.
    pub fn none() -> Self {
        Self {
            search: Jitter::zero(),
            scroll: Jitter::zero(),
            open: Jitter::zero(),
            settle: Jitter::zero(),
        }
    }

    /// The same bounds for every kind of wait.
    pub fn uniform(jitter: Jitter) -> Self {
        Self {
            search: jitter,
            scroll: jitter,
            open: jitter,
            settle: jitter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 2000,
            max_delay_ms: 30000,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `CHANNELSCOUT_RETRY_*` values from `lookup`.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let defaults = Self::default();
        Self {
            max_retries: parsed_var(&lookup, "CHANNELSCOUT_RETRY_MAX", defaults.max_retries),
            base_delay_ms: parsed_var(&lookup, "CHANNELSCOUT_RETRY_BASE_MS", defaults.base_delay_ms),
            max_delay_ms: parsed_var(&lookup, "CHANNELSCOUT_RETRY_MAX_MS", defaults.max_delay_ms),
        }
    }

    /// Retries without any backoff.
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(30) as u32;
        let exp = 1u64 << shift;
        let base = self
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.max_delay_ms);
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((base as f64 * jitter) as u64)
    }
}

/// `key` from `lookup` parsed as `T`, or `default` when unset or unparseable.
pub(crate) fn parsed_var<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_sample_within_bounds() {
        let j = Jitter::secs(1, 3);
        for _ in 0..100 {
            let d = j.sample();
            assert!(d >= Duration::from_secs(1) && d < Duration::from_secs(3));
        }
    }

    #[test]
    fn jitter_swaps_reversed_bounds() {
        let j = Jitter::secs(9, 4);
        assert_eq!(j.min, Duration::from_secs(4));
        assert_eq!(j.max, Duration::from_secs(9));
    }

    #[test]
    fn fixed_jitter_returns_min() {
        assert_eq!(Jitter::secs(2, 2).sample(), Duration::from_secs(2));
        assert_eq!(Jitter::zero().sample(), Duration::ZERO);
    }

    #[test]
    fn default_pacing_bounds() {
        let p = Pacing::default();
        assert_eq!(p.search, Jitter::secs(5, 10));
        assert_eq!(p.scroll, Jitter::secs(1, 5));
        assert_eq!(p.open, Jitter::secs(2, 5));
        assert_eq!(p.settle, Jitter::secs(5, 10));
    }

    #[test]
    fn none_pacing_is_all_zero() {
        let p = Pacing::none();
        assert!(p.search.is_zero() && p.scroll.is_zero() && p.open.is_zero() && p.settle.is_zero());
    }

    #[tokio::test]
    async fn zero_wait_returns_immediately() {
        let start = std::time::Instant::now();
        Pacing::none().settle.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let cfg = RetryConfig {
            max_retries: 5,
            base_delay_ms: 1000,
            max_delay_ms: 3000,
        };
        let first = cfg.delay_for_attempt(1).as_millis();
        assert!((800..1200).contains(&first));
        let second = cfg.delay_for_attempt(2).as_millis();
        assert!((1600..2400).contains(&second));
        let capped = cfg.delay_for_attempt(10).as_millis();
        assert!((2400..3600).contains(&capped));
    }

    #[test]
    fn retry_from_lookup_overrides_and_ignores_garbage() {
        let cfg = RetryConfig::from_lookup(|key| match key {
            "CHANNELSCOUT_RETRY_MAX" => Some("5".to_string()),
            "CHANNELSCOUT_RETRY_BASE_MS" => Some("not a number".to_string()),
            _ => None,
        });
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.base_delay_ms, RetryConfig::default().base_delay_ms);
        assert_eq!(cfg.max_delay_ms, 30000);
    }

    #[test]
    fn immediate_retry_has_no_delay() {
        assert_eq!(RetryConfig::immediate(3).delay_for_attempt(4), Duration::ZERO);
    }
}
