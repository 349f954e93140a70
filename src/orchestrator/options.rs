use std::time::Duration;

use crate::error::PipelineError;
use crate::policy::RetryPolicy;

/// 单次 `run` 的参数
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// 最多检索的论文数
    pub max_results: usize,
    /// 同时进行的摘要任务上限
    pub concurrency: usize,
    /// 单次摘要尝试的超时
    pub per_paper_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            concurrency: 4,
            per_paper_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineOptions {
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, per_paper_timeout: Duration) -> Self {
        self.per_paper_timeout = per_paper_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 参数为零时无法推进，视为调用方错误
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_results == 0 {
            return Err(PipelineError::InvalidInput("max_results 必须大于 0".to_string()));
        }
        if self.concurrency == 0 {
            return Err(PipelineError::InvalidInput("concurrency 必须大于 0".to_string()));
        }
        if self.retry.max_attempts() == 0 {
            return Err(PipelineError::InvalidInput("max_attempts 必须大于 0".to_string()));
        }
        if self.per_paper_timeout.is_zero() {
            return Err(PipelineError::InvalidInput("per_paper_timeout 必须大于 0".to_string()));
        }
        Ok(())
    }
}
