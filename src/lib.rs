//! # Paper Scout
//!
//! 按主题检索 arXiv 论文，并发下载 PDF、提取文本、调用 LLM 生成摘要，
//! 最终按检索顺序汇总为一份报告。单篇论文失败不影响其它论文。
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 只负责与外部服务通信
//! - `ArxivClient` - arXiv Atom 接口
//! - `PdfFetcher` - PDF 下载（远程或本地文件）
//! - `LlmClient` - OpenAI 兼容的聊天接口
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇论文
//! - `PaperSearch` - 检索能力
//! - `Summarizer` - 摘要能力（下载 → 提取 → LLM）
//!
//! ### ③ 策略层（Policy）
//! - `policy/` - 重试与退避策略
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 整次查询：并发控制、顺序汇总、取消
//! - `orchestrator/paper_task` - 单篇论文：超时、重试状态机
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod presentation;
pub mod services;
pub mod testing;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{PipelineError, SummarizeError};
pub use models::{FailureKind, PaperRef, Report, SummaryOutcome};
pub use orchestrator::{Pipeline, PipelineOptions};
pub use policy::RetryPolicy;
