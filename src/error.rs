//! 错误类型
//!
//! 分两级：
//! - `PipelineError`：整个请求失败（调用方错误或搜索服务不可用），不产生报告
//! - `SummarizeError`：只影响单篇论文，由编排层收敛为 `SummaryOutcome::Failure`

use thiserror::Error;

use crate::models::FailureKind;

/// 整个 `run` 失败的错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 调用方输入错误（空主题、非法参数），不会发出任何网络请求
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 搜索服务不可用或返回了无法解析的数据
    #[error("搜索服务不可用: {0}")]
    SearchUnavailable(String),

    /// 搜索阶段即被取消，尚无任何论文可报告
    #[error("查询已取消")]
    Cancelled,
}

impl From<SearchError> for PipelineError {
    fn from(err: SearchError) -> Self {
        PipelineError::SearchUnavailable(err.to_string())
    }
}

/// 搜索客户端错误
///
/// 所有变体对编排层来说都等价于 `SearchUnavailable`，这里保留细分只为日志
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} ({endpoint})")]
    BadStatus { endpoint: String, status: u16 },

    #[error("返回内容类型异常: {content_type}, 内容预览: {preview}")]
    UnexpectedContent {
        content_type: String,
        preview: String,
    },

    #[error("Atom 解析失败: {0}")]
    Malformed(String),
}

/// 单篇论文摘要失败
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SummarizeError {
    pub kind: FailureKind,
    pub message: String,
}

impl SummarizeError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn download(message: impl Into<String>) -> Self {
        Self::new(FailureKind::DownloadFailed, message)
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ExtractionFailed, message)
    }

    pub fn llm_unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::LlmUnavailable, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureKind::LlmRateLimited, message)
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self::new(FailureKind::LlmRefused, message)
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },

    #[error("不支持的 LLM 提供方: {0} (可选: openai / anthropic / google)")]
    UnknownProvider(String),
}
