//! 测试辅助：检索与摘要能力的可编排替身
//!
//! 不发出任何网络请求，适合验证编排层的顺序、并发、重试和取消行为

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{SearchError, SummarizeError};
use crate::models::PaperRef;
use crate::services::{PaperSearch, Summarizer};

/// 生成 `n` 篇测试论文，id 为 `p1..pn`
pub fn sample_papers(n: usize) -> Vec<PaperRef> {
    (1..=n)
        .map(|i| {
            PaperRef::new(
                format!("p{}", i),
                format!("Paper {}", i),
                format!("https://example.org/p{}.pdf", i),
            )
            .with_abstract(format!("Abstract of paper {}", i))
        })
        .collect()
}

/// 检索替身
pub struct MockSearch {
    papers: Vec<PaperRef>,
    failure_status: Option<u16>,
    delay: Duration,
    calls: AtomicUsize,
    topics: Mutex<Vec<String>>,
}

impl MockSearch {
    /// 总是返回给定论文（按 `max_results` 截断）
    pub fn new(papers: Vec<PaperRef>) -> Self {
        Self {
            papers,
            failure_status: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            topics: Mutex::new(Vec::new()),
        }
    }

    /// 总是返回空结果
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// 总是以 HTTP 状态码失败
    pub fn failing(status: u16) -> Self {
        Self {
            failure_status: Some(status),
            ..Self::empty()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 收到的检索主题，按调用顺序
    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaperSearch for MockSearch {
    async fn search(&self, topic: &str, max_results: usize) -> Result<Vec<PaperRef>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.topics.lock().unwrap().push(topic.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(status) = self.failure_status {
            return Err(SearchError::BadStatus {
                endpoint: "mock://search".to_string(),
                status,
            });
        }
        Ok(self.papers.iter().take(max_results).cloned().collect())
    }
}

type Scripted = Result<String, SummarizeError>;

#[derive(Default)]
struct PaperScript {
    /// 按调用顺序依次返回
    queue: VecDeque<Scripted>,
    /// 队列用完后一直返回
    fallback: Option<Scripted>,
    delay: Option<Duration>,
    calls: usize,
}

/// 摘要替身
///
/// 每篇论文可以编排一串结果，例如"先失败两次再成功"；
/// 同时记录调用次数和同时在处理的最大数量
#[derive(Default)]
pub struct MockSummarizer {
    scripts: Mutex<HashMap<String, PaperScript>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockSummarizer {
    /// 默认对每篇论文返回 `Summary of <id>`
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有论文的处理耗时
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 单篇论文的处理耗时
    pub fn with_delay_for(self, id: &str, delay: Duration) -> Self {
        self.script(id, |s| s.delay = Some(delay));
        self
    }

    /// 接下来 `times` 次调用返回 `err`
    pub fn fail_times(self, id: &str, err: SummarizeError, times: usize) -> Self {
        self.script(id, |s| {
            for _ in 0..times {
                s.queue.push_back(Err(err.clone()));
            }
        });
        self
    }

    /// 每次调用都返回 `err`
    pub fn fail_always(self, id: &str, err: SummarizeError) -> Self {
        self.script(id, |s| s.fallback = Some(Err(err)));
        self
    }

    /// 编排的失败用完后返回的摘要
    pub fn with_summary(self, id: &str, summary: &str) -> Self {
        self.script(id, |s| s.fallback = Some(Ok(summary.to_string())));
        self
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.scripts
            .lock()
            .unwrap()
            .get(id)
            .map(|s| s.calls)
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.scripts.lock().unwrap().values().map(|s| s.calls).sum()
    }

    /// 观察到的最大同时处理数
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn script(&self, id: &str, f: impl FnOnce(&mut PaperScript)) {
        let mut scripts = self.scripts.lock().unwrap();
        f(scripts.entry(id.to_string()).or_default());
    }

    /// 记录一次调用并取出本次结果和耗时
    fn next(&self, paper: &PaperRef) -> (Scripted, Duration) {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.entry(paper.id.clone()).or_default();
        script.calls += 1;

        let result = script
            .queue
            .pop_front()
            .or_else(|| script.fallback.clone())
            .unwrap_or_else(|| Ok(format!("Summary of {}", paper.id)));
        (result, script.delay.unwrap_or(self.delay))
    }
}

/// 离开作用域时减少在途计数（超时或取消导致 future 被丢弃时同样生效）
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, paper: &PaperRef) -> Result<String, SummarizeError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(self.in_flight.clone());
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let (result, delay) = self.next(paper);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
