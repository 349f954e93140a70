use serde::{Deserialize, Serialize};

use crate::models::PaperRef;

/// 单篇论文的失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    DownloadFailed,
    ExtractionFailed,
    #[serde(rename = "LLMUnavailable")]
    LlmUnavailable,
    #[serde(rename = "LLMRateLimited")]
    LlmRateLimited,
    #[serde(rename = "LLMRefused")]
    LlmRefused,
    Timeout,
    Cancelled,
}

impl FailureKind {
    /// 是否属于瞬时故障（网络 / 限流），可以重试
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            FailureKind::DownloadFailed | FailureKind::LlmUnavailable | FailureKind::LlmRateLimited
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::DownloadFailed => "DownloadFailed",
            FailureKind::ExtractionFailed => "ExtractionFailed",
            FailureKind::LlmUnavailable => "LLMUnavailable",
            FailureKind::LlmRateLimited => "LLMRateLimited",
            FailureKind::LlmRefused => "LLMRefused",
            FailureKind::Timeout => "Timeout",
            FailureKind::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单篇论文的处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum SummaryOutcome {
    Success {
        paper: PaperRef,
        summary: String,
        attempts: u32,
        elapsed_ms: u64,
    },
    Failure {
        paper: PaperRef,
        kind: FailureKind,
        message: String,
        attempts: u32,
        elapsed_ms: u64,
    },
}

impl SummaryOutcome {
    pub fn paper(&self) -> &PaperRef {
        match self {
            SummaryOutcome::Success { paper, .. } | SummaryOutcome::Failure { paper, .. } => paper,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SummaryOutcome::Success { .. })
    }

    /// 失败类型，成功时为 `None`
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SummaryOutcome::Success { .. } => None,
            SummaryOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            SummaryOutcome::Success { attempts, .. } | SummaryOutcome::Failure { attempts, .. } => {
                *attempts
            }
        }
    }
}
