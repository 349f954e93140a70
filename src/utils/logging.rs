/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::ReportCounts;
use crate::orchestrator::PipelineOptions;

/// 初始化全局日志
///
/// 级别由 `RUST_LOG` 控制，默认 `info`。重复调用无副作用（测试中会多次调用）。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录一次查询开始
pub fn log_run_start(topic: &str, options: &PipelineOptions) {
    info!("{}", "=".repeat(60));
    info!("🔍 开始检索主题: '{}'", topic);
    info!(
        "📊 最多 {} 篇 | 并发 {} | 单篇超时 {:?} | 最多尝试 {} 次",
        options.max_results,
        options.concurrency,
        options.per_paper_timeout,
        options.retry.max_attempts()
    );
    info!("{}", "=".repeat(60));
}

/// 记录搜索结果数量
pub fn log_papers_found(total: usize, concurrency: usize) {
    info!("✓ 找到 {} 篇论文", total);
    info!("📋 最多同时处理 {} 篇\n", concurrency);
}

/// 记录一次外部调用（工具调用）
pub fn log_tool_call(tool_name: &str, args: &str, latency: Duration, outcome: &str) {
    info!(
        "Tool Call: {}({}), Latency: {:.2}s, Outcome: {}",
        tool_name,
        args,
        latency.as_secs_f64(),
        outcome
    );
}

/// 打印最终统计信息
pub fn print_final_stats(counts: &ReportCounts, elapsed: Duration) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("总耗时: {:.1}s", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", counts.succeeded, counts.requested);
    info!("❌ 失败: {}", counts.failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
