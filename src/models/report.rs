use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SummaryOutcome;

/// 报告计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// 一次主题查询的汇总报告
///
/// `outcomes` 与搜索返回的论文一一对应且顺序一致。创建后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub topic: String,
    pub outcomes: Vec<SummaryOutcome>,
    pub counts: ReportCounts,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// 由按搜索顺序排列的结果构建报告，计数由结果推导
    pub fn new(topic: impl Into<String>, outcomes: Vec<SummaryOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let counts = ReportCounts {
            requested: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        };

        Self {
            topic: topic.into(),
            outcomes,
            counts,
            generated_at: Utc::now(),
        }
    }

    /// 搜索无结果时的空报告
    pub fn empty(topic: impl Into<String>) -> Self {
        Self::new(topic, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureKind, PaperRef};

    fn paper(id: &str) -> PaperRef {
        PaperRef::new(id, format!("Paper {}", id), format!("https://arxiv.org/pdf/{}", id))
    }

    #[test]
    fn test_counts_follow_outcomes() {
        let outcomes = vec![
            SummaryOutcome::Success {
                paper: paper("a"),
                summary: "ok".to_string(),
                attempts: 1,
                elapsed_ms: 5,
            },
            SummaryOutcome::Failure {
                paper: paper("b"),
                kind: FailureKind::DownloadFailed,
                message: "404".to_string(),
                attempts: 3,
                elapsed_ms: 5,
            },
        ];

        let report = Report::new("quantum computing", outcomes);
        assert_eq!(
            report.counts,
            ReportCounts {
                requested: 2,
                succeeded: 1,
                failed: 1
            }
        );
        assert!(!report.is_empty());
    }

    #[test]
    fn test_empty_report() {
        let report = Report::empty("nothing");
        assert!(report.is_empty());
        assert_eq!(report.counts, ReportCounts::default());
    }
}
