//! 阶段重试策略
//!
//! 固定最大尝试次数 + 线性退避：第 n 次失败后等待 n × base_delay 再重试。
//! 最后一次失败不再等待，直接包装为 RetriesExhausted。

use std::future::Future;
use std::time::Duration;

use crate::core::{AgentError, Phase, RetriesExhaustedError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// max_attempts 至少为 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 attempt 次（从 1 开始）失败后的等待时长
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// 还能否在第 attempt 次失败后继续重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// 按策略执行 op；op 收到当前尝试序号（从 1 开始）
    pub async fn run<T, F, Fut>(&self, phase: Phase, mut op: F) -> Result<T, AgentError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tracing::warn!(%phase, attempt, error = %err, "attempt failed");
                    if !self.should_retry(attempt) {
                        return Err(RetriesExhaustedError {
                            phase,
                            attempts: attempt,
                            last: Box::new(err),
                        }
                        .into());
                    }
                    tokio::time::sleep(self.delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}
