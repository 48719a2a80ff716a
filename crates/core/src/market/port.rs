use crate::market::entity::{Candle, MarketEvent};
use crate::market::error::MarketError;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// # Summary
/// K 线数据流别名，使用动态分发的异步流。
pub type CandleStream = Pin<Box<dyn Stream<Item = Candle> + Send>>;

/// # Summary
/// 行情事件流别名，承载会话广播出的节拍与指标覆盖事件。
pub type MarketEventStream = Pin<Box<dyn Stream<Item = MarketEvent> + Send>>;

/// # Summary
/// K 线数据源契约（原始行情提供者）。
///
/// # Invariants
/// - 价格序列必须连续：每根新 K 线的开盘价等于上一根的收盘价，
///   `history` 产出的最后一根与 `subscribe` 产出的第一根之间同样成立。
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// # Summary
    /// 生成一段历史种子 K 线。
    ///
    /// # Logic
    /// 1. 从数据源内部的最新收盘价出发，逐根向前推进生成。
    /// 2. 时间戳按节拍间隔回溯对齐，最后一根紧邻当前时刻。
    ///
    /// # Arguments
    /// * `len`: 生成的 K 线数量。
    ///
    /// # Returns
    /// 按时间升序排列的 K 线列表。
    fn history(&self, len: usize) -> Vec<Candle>;

    /// # Summary
    /// 订阅实时 K 线流。
    ///
    /// # Logic
    /// 1. 启动内部节拍任务，按固定间隔产出下一根 K 线。
    /// 2. 持续推入流中，直到订阅方丢弃流。
    ///
    /// # Returns
    /// 成功返回异步流 CandleStream。
    async fn subscribe(&self) -> Result<CandleStream, MarketError>;
}

/// # Summary
/// 震荡指标回写端口，供信号域向行情视图覆盖外部服务给出的数值。
///
/// # Invariants
/// - 覆盖必须对所有在线订阅者可见（广播语义）。
/// - 覆盖不得影响后续节拍的指标重算。
pub trait OscillatorSink: Send + Sync {
    /// # Summary
    /// 用外部给出的震荡值覆盖当前指标快照并广播。
    ///
    /// # Arguments
    /// * `value`: 外部服务给出的震荡指标值。
    fn apply_oscillator(&self, value: f64);
}
