//! # `kehai-signal` - 信号请求域
//!
//! 本 crate 实现交易信号链路的两个部件：`SignalProvider` 端口的
//! HTTP 适配器，以及驱动忙闲状态机的请求协调器。协调器保证同一
//! 时刻至多一个在途请求，并把松散类型的服务响应按领域规则合并为
//! 权威信号，任何失败都收敛为确定性的观望兜底。
//!
//! ## 架构职责
//! - 以有界超时的 HTTP 请求访问外部信号服务
//! - 管理 `Idle -> Requesting -> Idle` 状态机与重复触发守卫
//! - 向订阅者广播请求进度与权威信号的整体替换
//! - 把响应中的震荡值经 `OscillatorSink` 端口回写行情视图

pub mod coordinator;
pub mod http;
