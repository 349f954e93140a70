//! 论文检索服务 - 业务能力层
//!
//! 只负责"检索"能力，不关心后续流程

use std::time::Instant;

use async_trait::async_trait;

use crate::clients::ArxivClient;
use crate::error::SearchError;
use crate::models::PaperRef;
use crate::utils::logging::log_tool_call;

/// 论文检索能力
///
/// 返回有序、长度不超过 `max_results` 的论文列表；无结果时返回空列表而不是错误。
#[async_trait]
pub trait PaperSearch: Send + Sync {
    async fn search(&self, topic: &str, max_results: usize) -> Result<Vec<PaperRef>, SearchError>;
}

/// 基于 arXiv 的检索服务
pub struct ArxivSearch {
    client: ArxivClient,
}

impl ArxivSearch {
    pub fn new(client: ArxivClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaperSearch for ArxivSearch {
    async fn search(&self, topic: &str, max_results: usize) -> Result<Vec<PaperRef>, SearchError> {
        let args = format!("query={:?}, max_results={}", topic, max_results);
        let start = Instant::now();

        let result = self.client.search(topic, max_results).await;

        let outcome = match &result {
            Ok(papers) => format!("Success ({} papers)", papers.len()),
            Err(e) => format!("Request Failed: {}", e),
        };
        log_tool_call("paper_search", &args, start.elapsed(), &outcome);

        result
    }
}
