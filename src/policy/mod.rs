//! 策略层
//!
//! 重试与退避以策略对象的形式注入编排层，测试中可以替换成立即重试的策略。

pub mod retry;

pub use retry::{Backoff, ExponentialBackoff, NoBackoff, RetryPolicy};
