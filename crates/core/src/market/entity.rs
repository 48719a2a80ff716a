use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根 K 线数据实体，记录模拟行情某一节拍内的价格波动。
///
/// # Invariants
/// - `high` 必须大于或等于 `open`、`close`、`low`。
/// - `low` 必须小于或等于 `open`、`close`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量（整数手）
    pub volume: i64,
}

/// # Summary
/// 指标快照，由指标引擎对当前窗口整体重算得出。
///
/// # Invariants
/// - 窗口样本不足最小计算周期时必须等于 `neutral()`。
/// - 三个数值均为已按精度截断后的展示值。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    // 动量震荡值（0-100 语义区间）
    pub oscillator: f64,
    // 主均线：全窗口收盘价的算术平均
    pub moving_average: f64,
    // 次均线：收盘价的指数加权平均
    pub secondary_average: f64,
}

impl IndicatorSnapshot {
    /// # Summary
    /// 样本不足时的中性基线快照。
    pub const fn neutral() -> Self {
        Self {
            oscillator: 50.0,
            moving_average: 0.0,
            secondary_average: 0.0,
        }
    }
}

/// # Summary
/// 行情广播事件，市场会话向所有订阅者扇出的载荷。
///
/// # Invariants
/// - `Tick` 中的指标必须是同一根 K 线入窗后重算的结果。
/// - 指标覆盖与节拍重算互相独立，订阅者以收到的最后一条为准。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    // 周期节拍：新 K 线入窗后的最新视图
    Tick {
        candle: Candle,
        indicators: IndicatorSnapshot,
    },
    // 信号侧回写：外部服务返回的震荡值覆盖
    IndicatorsOverride { indicators: IndicatorSnapshot },
}
