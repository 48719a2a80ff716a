use crate::common::TimeFrame;
use crate::signal::entity::{SignalEvent, SignalResponse};
use crate::signal::error::SignalError;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// # Summary
/// 信号事件流别名，使用动态分发的异步流。
pub type SignalEventStream = Pin<Box<dyn Stream<Item = SignalEvent> + Send>>;

/// # Summary
/// 外部信号服务契约。
///
/// # Invariants
/// - 实现者必须在有界时间内返回（内置请求超时），不得无限阻塞调用方。
/// - 返回的载荷不做字段校验，缺省字段的处理交给领域层合并规则。
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// # Summary
    /// 向信号服务查询一次交易建议。
    ///
    /// # Logic
    /// 1. 以 `pair` 与 `timeframe` 为查询参数构建请求（转义交给传输层）。
    /// 2. 等待响应并反序列化为 SignalResponse。
    ///
    /// # Arguments
    /// * `pair`: 交易对标识。
    /// * `timeframe`: 时间周期。
    ///
    /// # Returns
    /// 成功返回原始响应载荷，失败返回 SignalError。
    async fn fetch_signal(
        &self,
        pair: &str,
        timeframe: TimeFrame,
    ) -> Result<SignalResponse, SignalError>;
}
