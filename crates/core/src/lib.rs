//! # `kehai-core` - 领域核心
//!
//! 本 crate 是 Kehai 交易辅助引擎的领域核心层（六边形架构的中心）。
//! 只定义实体、端口契约与错误类型，不包含任何 IO 与运行时逻辑。
//!
//! ## 架构职责
//! - 定义行情域与信号域的实体，以及响应合并、失败兜底等纯函数规则
//! - 以 trait（端口）的形式约束外层适配器的行为
//! - 提供全局配置结构与默认值

pub mod common;
pub mod config;
pub mod market;
pub mod signal;
