//! 主题查询流水线 - 编排层
//!
//! 只做调度和统计，具体能力通过 `PaperSearch` / `Summarizer` 注入

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::models::{FailureKind, Report, SummaryOutcome};
use crate::orchestrator::{PaperTask, PipelineOptions};
use crate::services::{PaperSearch, Summarizer};
use crate::utils::logging::{log_papers_found, log_run_start, print_final_stats};

/// 论文检索与摘要流水线
#[derive(Clone)]
pub struct Pipeline {
    search: Arc<dyn PaperSearch>,
    summarizer: Arc<dyn Summarizer>,
}

impl Pipeline {
    pub fn new(search: Arc<dyn PaperSearch>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { search, summarizer }
    }

    /// 执行一次查询
    ///
    /// 只有输入无效或检索失败才返回错误；单篇论文的失败体现在报告里
    pub async fn run(&self, topic: &str, options: &PipelineOptions) -> Result<Report, PipelineError> {
        self.run_with_cancel(topic, options, CancellationToken::new())
            .await
    }

    /// 执行一次查询，`cancel` 触发后尚未完成的论文记为 `Cancelled`
    pub async fn run_with_cancel(
        &self,
        topic: &str,
        options: &PipelineOptions,
        cancel: CancellationToken,
    ) -> Result<Report, PipelineError> {
        // 只用于判空，检索时使用原始主题
        if topic.trim().is_empty() {
            return Err(PipelineError::InvalidInput("主题不能为空".to_string()));
        }
        options.validate()?;

        let started = Instant::now();
        log_run_start(topic, options);

        let searched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("⚠️ 检索阶段已取消");
                return Err(PipelineError::Cancelled);
            }
            result = self.search.search(topic, options.max_results) => result,
        };
        let papers = searched.map_err(|e| {
            error!("❌ 检索失败: {}", e);
            PipelineError::from(e)
        })?;

        // 检索端可能不遵守上限
        let papers: Vec<_> = papers.into_iter().take(options.max_results).collect();

        if papers.is_empty() {
            warn!("⚠️ 没有找到与 '{}' 相关的论文", topic);
            return Ok(Report::empty(topic));
        }

        let total = papers.len();
        log_papers_found(total, options.concurrency);

        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        // 随 run 一起丢弃时中止全部任务
        let mut tasks: JoinSet<(usize, SummaryOutcome)> = JoinSet::new();

        for (idx, paper) in papers.iter().cloned().enumerate() {
            let task = PaperTask::new(paper, idx + 1, total);
            let semaphore = semaphore.clone();
            let summarizer = self.summarizer.clone();
            let retry = options.retry.clone();
            let cancel = cancel.clone();
            let timeout = options.per_paper_timeout;
            tasks.spawn(async move {
                let outcome = task
                    .run_with_slot(semaphore, summarizer, timeout, retry, cancel)
                    .await;
                (idx, outcome)
            });
        }

        // 按完成顺序收集，再按检索顺序放回
        let mut slots: Vec<Option<SummaryOutcome>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => error!("❌ 任务执行失败: {}", e),
            }
        }

        let outcomes: Vec<SummaryOutcome> = slots
            .into_iter()
            .zip(papers)
            .enumerate()
            .map(|(idx, (slot, paper))| {
                slot.unwrap_or_else(|| {
                    error!("[论文 {}/{}] 任务异常终止，没有返回结果", idx + 1, total);
                    SummaryOutcome::Failure {
                        paper,
                        kind: FailureKind::Cancelled,
                        message: "任务异常终止".to_string(),
                        attempts: 0,
                        elapsed_ms: 0,
                    }
                })
            })
            .collect();

        let report = Report::new(topic, outcomes);
        print_final_stats(&report.counts, started.elapsed());
        if cancel.is_cancelled() {
            info!("🛑 查询已取消，报告包含已完成的部分");
        }

        Ok(report)
    }
}
