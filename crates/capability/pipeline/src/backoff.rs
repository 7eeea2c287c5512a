use rand::Rng;
use std::time::Duration;

/// 指数退避策略（倍数固定为 2）。
///
/// - initial：第 0 次重试前的基础延迟
/// - max：延迟上限
/// - jitter：在 `[d/2, d]` 内均匀取值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub jitter: bool,
}

impl BackoffPolicy {
    pub const MULTIPLIER: u32 = 2;

    pub const fn new(initial: Duration, max: Duration, jitter: bool) -> Self {
        Self {
            initial,
            max,
            jitter,
        }
    }

    /// 不含抖动的延迟：`min(initial * 2^attempt, max)`。
    pub fn next_delay(&self, attempt: u32) -> Duration {
        Self::MULTIPLIER
            .checked_pow(attempt)
            .and_then(|factor| self.initial.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// 实际使用的延迟（按配置决定是否抖动）。
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.next_delay(attempt);
        if !self.jitter {
            return delay;
        }
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rand::thread_rng().gen_range(nanos / 2..=nanos))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), true)
    }
}
