use std::time::Duration;

/// 重试间隔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 固定延迟
    Fixed(Duration),
    /// 指数退避，`base * 2^(n-1)`，不超过 `max`
    Exponential { base: Duration, max: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(Duration::from_millis(1000))
    }
}

impl Backoff {
    pub fn fixed(delay: Duration) -> Self {
        Backoff::Fixed(delay)
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Backoff::Exponential { base, max }
    }

    /// 第 `failed_attempts` 次失败之后的等待时间（从 1 开始）
    pub fn delay(&self, failed_attempts: usize) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let shift = failed_attempts.saturating_sub(1).min(10) as u32;
                base.saturating_mul(1 << shift).min(max)
            }
        }
    }
}
