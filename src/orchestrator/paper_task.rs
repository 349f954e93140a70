//! 单篇论文任务 - 编排层
//!
//! 状态机：
//!
//! ```text
//! Pending → InFlight → {Retrying → InFlight}* → {Succeeded | FailedTerminal | TimedOut | Cancelled}
//! ```
//!
//! - 只有瞬时故障且仍有剩余次数时才进入 `Retrying`
//! - 超时作用于每一次尝试，超时即终止，不再重试
//! - 两次尝试之间的退避不超过单次超时，因此单篇论文最长耗时为
//!   `(2 * max_attempts - 1) * per_paper_timeout`
//! - 取消信号在任意等待点生效

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{FailureKind, PaperRef, SummaryOutcome};
use crate::policy::RetryPolicy;
use crate::services::Summarizer;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    InFlight { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
    Succeeded,
    FailedTerminal(FailureKind),
    TimedOut,
    Cancelled,
}

impl TaskState {
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded
                | TaskState::FailedTerminal(_)
                | TaskState::TimedOut
                | TaskState::Cancelled
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => write!(f, "Pending"),
            TaskState::InFlight { attempt } => write!(f, "InFlight(#{})", attempt),
            TaskState::Retrying { attempt, delay } => {
                write!(f, "Retrying(#{} 后等待 {:?})", attempt, delay)
            }
            TaskState::Succeeded => write!(f, "Succeeded"),
            TaskState::FailedTerminal(kind) => write!(f, "FailedTerminal({})", kind),
            TaskState::TimedOut => write!(f, "TimedOut"),
            TaskState::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// 单篇论文任务
pub struct PaperTask {
    paper: PaperRef,
    /// 从 1 开始，仅用于日志
    index: usize,
    total: usize,
    state: TaskState,
    attempts: u32,
    started: Option<Instant>,
}

impl PaperTask {
    pub fn new(paper: PaperRef, index: usize, total: usize) -> Self {
        Self {
            paper,
            index,
            total,
            state: TaskState::Pending,
            attempts: 0,
            started: None,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    fn transition(&mut self, next: TaskState) {
        debug!("[论文 {}/{}] {} → {}", self.index, self.total, self.state, next);
        self.state = next;
    }

    /// 等待并发槽位，然后执行；排队期间被取消则直接记为 `Cancelled`
    pub async fn run_with_slot(
        mut self,
        semaphore: Arc<Semaphore>,
        summarizer: Arc<dyn Summarizer>,
        timeout: Duration,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> SummaryOutcome {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = semaphore.acquire_owned() => permit.ok(),
        };

        let Some(_permit) = permit else {
            self.transition(TaskState::Cancelled);
            return self.fail(FailureKind::Cancelled, "排队期间已取消".to_string());
        };

        self.run(summarizer.as_ref(), timeout, &retry, &cancel).await
    }

    /// 执行重试循环直到结束
    pub async fn run(
        mut self,
        summarizer: &dyn Summarizer,
        timeout: Duration,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> SummaryOutcome {
        self.started = Some(Instant::now());
        info!(
            "[论文 {}/{}] 📄 开始处理: {}",
            self.index, self.total, self.paper
        );

        loop {
            self.attempts += 1;
            let attempt = self.attempts;
            self.transition(TaskState::InFlight { attempt });

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.transition(TaskState::Cancelled);
                    return self.fail(FailureKind::Cancelled, "处理中已取消".to_string());
                }
                result = tokio::time::timeout(timeout, summarizer.summarize(&self.paper)) => result,
            };

            let err = match result {
                Ok(Ok(summary)) => {
                    self.transition(TaskState::Succeeded);
                    info!(
                        "[论文 {}/{}] ✅ 摘要完成 (第 {} 次尝试)",
                        self.index, self.total, attempt
                    );
                    return self.succeed(summary);
                }
                Ok(Err(err)) => err,
                Err(_) => {
                    self.transition(TaskState::TimedOut);
                    warn!(
                        "[论文 {}/{}] ⏱️ 第 {} 次尝试超时 ({:?})",
                        self.index, self.total, attempt, timeout
                    );
                    return self.fail(
                        FailureKind::Timeout,
                        format!("第 {} 次尝试超过 {:?}", attempt, timeout),
                    );
                }
            };

            if !retry.should_retry(err.kind, attempt) {
                self.transition(TaskState::FailedTerminal(err.kind));
                warn!(
                    "[论文 {}/{}] ❌ 失败 (第 {} 次尝试): {}",
                    self.index, self.total, attempt, err
                );
                return self.fail(err.kind, err.message);
            }

            let delay = retry.delay_after(attempt).min(timeout);
            self.transition(TaskState::Retrying { attempt, delay });
            warn!(
                "[论文 {}/{}] ⚠️ {} (尝试 {}/{}), 等待 {:?} 后重试...",
                self.index,
                self.total,
                err,
                attempt,
                retry.max_attempts(),
                delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.transition(TaskState::Cancelled);
                    return self.fail(FailureKind::Cancelled, "重试等待期间已取消".to_string());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn succeed(self, summary: String) -> SummaryOutcome {
        SummaryOutcome::Success {
            elapsed_ms: self.elapsed_ms(),
            attempts: self.attempts,
            paper: self.paper,
            summary,
        }
    }

    fn fail(self, kind: FailureKind, message: String) -> SummaryOutcome {
        SummaryOutcome::Failure {
            elapsed_ms: self.elapsed_ms(),
            attempts: self.attempts,
            paper: self.paper,
            kind,
            message,
        }
    }
}
