//! 重试策略
//!
//! - 只有瞬时故障（`DownloadFailed` / `LLMUnavailable` / `LLMRateLimited`）会被重试
//! - 第 n 次失败后等待 `base * 2^(n-1)`，可选抖动，避免多篇论文同时重试同一个服务

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::models::FailureKind;

/// 退避时间上限
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// 退避策略
pub trait Backoff: Send + Sync + fmt::Debug {
    /// 第 `attempt` 次尝试失败后（从 1 开始）需要等待的时间
    fn delay(&self, attempt: u32) -> Duration;
}

/// 指数退避
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl ExponentialBackoff {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            max_delay: MAX_BACKOFF,
            jitter: true,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// 不含抖动的基准等待时间
    fn raw_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let raw = self.raw_delay(attempt);
        if !self.jitter || raw.is_zero() {
            return raw;
        }

        // equal jitter: 在 [raw/2, raw] 之间随机
        let half = raw / 2;
        let spread = (raw - half).as_millis() as u64;
        let extra = rand::thread_rng().gen_range(0..=spread);
        half + Duration::from_millis(extra)
    }
}

/// 不等待，立即重试
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// 重试策略：最大尝试次数 + 退避策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Arc<dyn Backoff>,
}

impl RetryPolicy {
    /// `max_attempts` 为总尝试次数（包含第一次）
    pub fn new(max_attempts: u32, backoff: impl Backoff + 'static) -> Self {
        Self {
            max_attempts,
            backoff: Arc::new(backoff),
        }
    }

    /// 带抖动的指数退避
    pub fn exponential(max_attempts: u32, base: Duration) -> Self {
        Self::new(max_attempts, ExponentialBackoff::new(base))
    }

    /// 立即重试，用于测试
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, NoBackoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 `attempt` 次尝试以 `kind` 失败后是否还应重试
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> bool {
        kind.is_transient() && attempt < self.max_attempts
    }

    /// 第 `attempt` 次尝试失败后的等待时间
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_secs(1))
    }
}
