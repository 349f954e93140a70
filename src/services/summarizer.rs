//! 摘要服务 - 业务能力层
//!
//! 单篇论文：下载 PDF → 提取文本 → 调用 LLM。
//! 只处理一篇论文，不关心重试、超时和并发（由编排层负责）。

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::clients::{LlmClient, PdfFetcher};
use crate::error::SummarizeError;
use crate::models::PaperRef;
use crate::services::extract;
use crate::utils::logging::log_tool_call;

const SYSTEM_PROMPT: &str = "You are a research paper summarizer.";

/// 单篇论文摘要能力
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, paper: &PaperRef) -> Result<String, SummarizeError>;
}

/// 基于 PDF 全文的摘要服务
pub struct PdfSummarizer {
    fetcher: PdfFetcher,
    llm: LlmClient,
    max_input_chars: usize,
}

impl PdfSummarizer {
    pub fn new(fetcher: PdfFetcher, llm: LlmClient, max_input_chars: usize) -> Self {
        Self {
            fetcher,
            llm,
            max_input_chars,
        }
    }

    async fn summarize_inner(&self, paper: &PaperRef) -> Result<String, SummarizeError> {
        let bytes = self.fetcher.fetch(&paper.pdf_url).await?;
        debug!("[{}] PDF 下载完成: {} KB", paper.id, bytes.len() / 1024);

        let text = extract::extract_text(bytes, self.max_input_chars).await?;

        let prompt = build_summary_prompt(&text);
        self.llm.send_to_llm(&prompt, Some(SYSTEM_PROMPT)).await
    }
}

#[async_trait]
impl Summarizer for PdfSummarizer {
    async fn summarize(&self, paper: &PaperRef) -> Result<String, SummarizeError> {
        let args = format!("pdf_url={:?}", paper.pdf_url);
        let start = Instant::now();

        let result = self.summarize_inner(paper).await;

        let outcome = match &result {
            Ok(_) => "Success".to_string(),
            Err(e) => format!("Request Failed: {}", e),
        };
        log_tool_call("pdf_summarize", &args, start.elapsed(), &outcome);

        result
    }
}

/// 构建摘要提示词
pub fn build_summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following research paper content in a concise manner (max 200 words), \
         highlighting its main objectives, methods, and key findings:\n\n{}",
        text
    )
}
