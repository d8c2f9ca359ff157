//! Bounded polling for blocks that render after the page reports ready.

use std::time::Duration;

/// Attempt count and spacing for [`RetryPolicy::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Call `check` until it yields a value or the attempts run out.
    ///
    /// Sleeps `interval` between attempts, never after the last one.
    pub async fn poll<T>(&self, mut check: impl FnMut() -> Option<T>) -> Option<T> {
        for attempt in 1..=self.attempts {
            if let Some(value) = check() {
                return Some(value);
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        None
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(15, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_first_success() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;
        let value = policy
            .poll(|| {
                calls += 1;
                (calls == 3).then_some("ready")
            })
            .await;
        assert_eq!(value, Some("ready"));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempts() {
        let policy = RetryPolicy::new(4, Duration::ZERO);
        let mut calls = 0;
        let value: Option<()> = policy
            .poll(|| {
                calls += 1;
                None
            })
            .await;
        assert!(value.is_none());
        assert_eq!(calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts_only() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let start = tokio::time::Instant::now();
        let _: Option<()> = policy.poll(|| None).await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn default_matches_render_polling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 15);
        assert_eq!(policy.interval, Duration::from_secs(1));
    }
}
