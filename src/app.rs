//! 应用入口
//!
//! 负责组装客户端和服务、管理一次或多次查询的生命周期

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::clients::{ArxivClient, LlmClient, PdfFetcher};
use crate::config::Config;
use crate::error::PipelineError;
use crate::models::Report;
use crate::orchestrator::{Pipeline, PipelineOptions};
use crate::presentation::{render_json, render_text};
use crate::services::{ArxivSearch, PdfSummarizer};

/// 交互模式下的默认论文数
const DEFAULT_INTERACTIVE_COUNT: usize = 3;

/// 应用主结构
pub struct App {
    config: Config,
    pipeline: Pipeline,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let arxiv = ArxivClient::new(
            config.arxiv_api_url.clone(),
            Duration::from_secs(config.search_timeout_secs),
        )
        .context("创建 arXiv 客户端失败")?;

        let fetcher = PdfFetcher::new(
            Duration::from_secs(config.download_timeout_secs),
            config.max_pdf_bytes,
        )
        .context("创建 PDF 下载客户端失败")?;

        let llm = LlmClient::new(&config.llm).context("创建 LLM 客户端失败")?;
        if !config.llm.has_api_key() {
            warn!(
                "⚠️ 未设置 {} 的 API key，所有摘要都会以 LLMUnavailable 失败",
                config.llm.provider
            );
        }

        let pipeline = Pipeline::new(
            Arc::new(ArxivSearch::new(arxiv)),
            Arc::new(PdfSummarizer::new(fetcher, llm, config.max_input_chars)),
        );

        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 执行一次查询并输出报告
    pub async fn run_once(&self, topic: &str, options: &PipelineOptions, json: bool) -> Result<Report> {
        let report = self.run_cancellable(topic, options).await?;

        if json {
            println!("{}", render_json(&report).context("序列化报告失败")?);
        } else {
            println!("{}", render_text(&report));
        }

        Ok(report)
    }

    /// 交互模式：循环读取主题和论文数，输入 exit / quit 退出
    pub async fn run_interactive(&self, options: &PipelineOptions, json: bool) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            prompt("\n请输入研究主题 (输入 'exit' 退出): ")?;
            let Some(line) = read_or_interrupt(lines.next_line(), tokio::signal::ctrl_c()).await?
            else {
                break;
            };
            let topic = line.trim();
            if topic.is_empty() {
                continue;
            }
            if matches!(topic.to_lowercase().as_str(), "exit" | "quit") {
                break;
            }
            let topic = topic.to_string();

            prompt(&format!(
                "请输入论文数量 (默认 {}): ",
                DEFAULT_INTERACTIVE_COUNT
            ))?;
            let Some(count_line) =
                read_or_interrupt(lines.next_line(), tokio::signal::ctrl_c()).await?
            else {
                break;
            };
            let Some(count) = parse_paper_count(&count_line) else {
                warn!("⚠️ 论文数量必须是正整数");
                continue;
            };

            let options = options.clone().with_max_results(count);
            if let Err(e) = self.run_once(&topic, &options, json).await {
                error!("❌ 查询失败: {:#}", e);
            }
        }

        info!("👋 再见");
        Ok(())
    }

    /// 运行期间按 Ctrl-C 只取消当前查询
    async fn run_cancellable(
        &self,
        topic: &str,
        options: &PipelineOptions,
    ) -> Result<Report, PipelineError> {
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("🛑 收到 Ctrl-C，正在取消当前查询...");
                    cancel.cancel();
                }
            })
        };

        let result = self.pipeline.run_with_cancel(topic, options, cancel).await;
        watcher.abort();
        result
    }
}

/// 等待一行输入；输入结束或收到中断时返回 `None`
///
/// 查询期间注册过 Ctrl-C 监听后，进程不再按默认方式响应 SIGINT，
/// 所以提示符处也要自己监听中断
async fn read_or_interrupt<R, I>(read: R, interrupt: I) -> std::io::Result<Option<String>>
where
    R: Future<Output = std::io::Result<Option<String>>>,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        line = read => line,
        signal = interrupt => {
            signal?;
            println!();
            Ok(None)
        }
    }
}

/// 解析论文数量，空输入使用默认值
fn parse_paper_count(input: &str) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() {
        return Some(DEFAULT_INTERACTIVE_COUNT);
    }
    input.parse::<usize>().ok().filter(|n| *n > 0)
}

fn prompt(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
}

/// 记录启动信息
fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("📚 Paper Scout 启动");
    info!("🔗 检索接口: {}", config.arxiv_api_url);
    info!(
        "🤖 LLM: {} / {}",
        config.llm.provider,
        config.llm.model().unwrap_or_default()
    );
    info!("{}", "=".repeat(60));
}
