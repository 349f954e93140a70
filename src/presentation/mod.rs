//! 报告输出
//!
//! - `render_text`：终端阅读
//! - `render_json`：机器消费

use std::fmt::Write;

use crate::models::{Report, SummaryOutcome};

const RULE_WIDTH: usize = 60;

/// 渲染为终端文本
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "主题: {}", report.topic);
    let _ = writeln!(
        out,
        "论文: {} 篇 | 成功: {} | 失败: {}",
        report.counts.requested, report.counts.succeeded, report.counts.failed
    );
    let _ = writeln!(out, "{}", rule);

    if report.is_empty() {
        let _ = writeln!(out, "没有找到相关论文。");
        return out;
    }

    let total = report.outcomes.len();
    for (idx, outcome) in report.outcomes.iter().enumerate() {
        let paper = outcome.paper();
        let _ = writeln!(out, "\n[{}/{}] {}", idx + 1, total, paper.title);
        if !paper.authors.is_empty() {
            let _ = writeln!(out, "作者: {}", paper.authors.join(", "));
        }
        if let Some(date) = paper.published {
            let _ = writeln!(out, "发布: {}", date);
        }
        let _ = writeln!(out, "链接: {}", paper.url.as_deref().unwrap_or(&paper.pdf_url));

        match outcome {
            SummaryOutcome::Success { summary, .. } => {
                let _ = writeln!(out, "\n摘要:\n{}", summary);
            }
            SummaryOutcome::Failure { kind, message, .. } => {
                let _ = writeln!(out, "\n⚠️ 无法生成摘要 ({}): {}", kind, message);
                if let Some(abstract_text) = &paper.abstract_text {
                    let _ = writeln!(out, "原始摘要:\n{}", abstract_text);
                }
            }
        }
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    }

    out
}

/// 渲染为格式化 JSON
pub fn render_json(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureKind, PaperRef};

    fn report() -> Report {
        let ok = PaperRef::new("a", "Attention Is All You Need", "https://arxiv.org/pdf/a")
            .with_authors(vec!["Vaswani".to_string(), "Shazeer".to_string()]);
        let bad = PaperRef::new("b", "Broken Paper", "https://arxiv.org/pdf/b")
            .with_abstract("We study broken things.");

        Report::new(
            "transformers",
            vec![
                SummaryOutcome::Success {
                    paper: ok,
                    summary: "Self-attention only.".to_string(),
                    attempts: 1,
                    elapsed_ms: 10,
                },
                SummaryOutcome::Failure {
                    paper: bad,
                    kind: FailureKind::ExtractionFailed,
                    message: "no text layer".to_string(),
                    attempts: 1,
                    elapsed_ms: 3,
                },
            ],
        )
    }

    #[test]
    fn test_render_text_shows_summary_and_fallback() {
        let text = render_text(&report());

        assert!(text.contains("主题: transformers"));
        assert!(text.contains("成功: 1 | 失败: 1"));
        assert!(text.contains("[1/2] Attention Is All You Need"));
        assert!(text.contains("Vaswani, Shazeer"));
        assert!(text.contains("Self-attention only."));
        assert!(text.contains("ExtractionFailed"));
        assert!(text.contains("We study broken things."));
        assert!(text.find("[1/2]").unwrap() < text.find("[2/2]").unwrap());
    }

    #[test]
    fn test_render_text_empty() {
        let text = render_text(&Report::empty("nothing"));
        assert!(text.contains("没有找到相关论文"));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["topic"], "transformers");
        assert_eq!(value["counts"]["succeeded"], 1);
        assert_eq!(value["outcomes"][0]["status"], "Success");
        assert_eq!(value["outcomes"][1]["kind"], "ExtractionFailed");
    }
}
