//! # `kehai-market` - 行情会话
//!
//! 本 crate 实现行情展示链路的有状态部分：滚动窗口、指标引擎与
//! 市场会话（流控制器）。会话从 `CandleSource` 端口拉取 K 线，
//! 逐根入窗并整体重算指标，再以广播事件扇出给所有订阅者。
//!
//! ## 架构职责
//! - 维护容量固定的 K 线滚动窗口及其不变量
//! - 每次窗口变更后重算指标快照
//! - 管理流的生命周期（幂等启动、原子停止）与多订阅者分发
//! - 以 `OscillatorSink` 端口接受信号域的震荡值覆盖

pub mod indicators;
pub mod session;
pub mod window;
