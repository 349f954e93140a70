//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 一次主题查询的调度中心：检索 → 按并发上限分发摘要任务 → 按搜索顺序汇总报告。
//! 单篇论文的失败在这里收敛为 `SummaryOutcome::Failure`，不会中断其它论文。
//!
//! ## 模块划分
//!
//! ### `pipeline` - 整次查询
//! - 校验输入、调用检索能力
//! - 用 Semaphore 限制同时进行的摘要数
//! - 保持结果顺序与搜索顺序一致
//! - 响应取消信号
//!
//! ### `paper_task` - 单篇论文
//! - 状态机：Pending → InFlight → Retrying → 终态
//! - 单次尝试超时、瞬时故障退避重试
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (处理 Vec<PaperRef>)
//!     ↓
//! paper_task (处理单个 PaperRef)
//!     ↓
//! services (能力层：search / summarize)
//!     ↓
//! clients (arXiv / PDF / LLM)
//! ```

pub mod options;
pub mod paper_task;
pub mod pipeline;

pub use options::PipelineOptions;
pub use paper_task::{PaperTask, TaskState};
pub use pipeline::Pipeline;
