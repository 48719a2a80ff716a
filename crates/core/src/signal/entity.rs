use crate::common::TimeFrame;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 初始占位信号的说明文案
pub const WAITING_RATIONALE: &str = "Waiting for signal...";
/// 请求失败兜底信号的说明文案
pub const UNREACHABLE_RATIONALE: &str = "Signal service unreachable.";

/// # Summary
/// 交易方向枚举。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    /// # Summary
    /// 把信号服务返回的方向原文映射为交易方向。
    ///
    /// # Logic
    /// 1. 原文整体转为大写后做子串匹配，容忍上游词汇变化。
    /// 2. 命中 `BUY` / `LONG` / `UP` 之一判定为买入。
    /// 3. 否则命中 `SELL` / `SHORT` / `DOWN` 之一判定为卖出。
    /// 4. 都未命中则回退为观望。
    ///
    /// # Arguments
    /// * `raw`: 服务返回的方向原文（如 "Strong Buy"）。
    ///
    /// # Returns
    /// 映射后的交易方向。
    pub fn from_service(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        if ["BUY", "LONG", "UP"].iter().any(|t| upper.contains(t)) {
            return Direction::Buy;
        }
        if ["SELL", "SHORT", "DOWN"].iter().any(|t| upper.contains(t)) {
            return Direction::Sell;
        }
        Direction::Hold
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
            Direction::Hold => write!(f, "HOLD"),
        }
    }
}

/// # Summary
/// 信号服务的原始响应载荷，所有字段均可缺省。
///
/// # Invariants
/// - 缺省字段不得导致反序列化失败，合并时按字段各自回退。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalResponse {
    // 方向原文（如 "BUY", "Strong Sell"）
    pub signal: Option<String>,
    // 置信度百分比
    pub confidence: Option<f64>,
    // 服务回显的交易对
    pub pair: Option<String>,
    // 服务回显的时间周期
    pub timeframe: Option<String>,
    // 人类可读的理由说明
    pub note: Option<String>,
    // 服务侧给出的震荡指标值
    pub rsi: Option<f64>,
}

/// # Summary
/// 权威交易信号实体，视图展示的唯一信号来源。
///
/// # Invariants
/// - `confidence` 恒在 0 到 100 之间。
/// - 每次请求完成（成功或失败）都整体替换，请求途中只允许
///   交易对与时间周期因用户编辑而被回显修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    // 建议方向
    pub direction: Direction,
    // 置信度（0-100）
    pub confidence: u8,
    // 交易对标识
    pub pair: String,
    // 时间周期
    pub timeframe: TimeFrame,
    // 理由说明
    pub rationale: String,
    // 本条信号的生成时刻
    pub issued_at: DateTime<Utc>,
}

impl TradeSignal {
    /// # Summary
    /// 启动时的观望占位信号。
    ///
    /// # Arguments
    /// * `pair`: 默认交易对。
    /// * `timeframe`: 默认时间周期。
    /// * `now`: 当前时刻。
    pub fn waiting(pair: impl Into<String>, timeframe: TimeFrame, now: DateTime<Utc>) -> Self {
        Self {
            direction: Direction::Hold,
            confidence: 0,
            pair: pair.into(),
            timeframe,
            rationale: WAITING_RATIONALE.to_string(),
            issued_at: now,
        }
    }

    /// # Summary
    /// 把服务响应合并到请求前的信号快照上，产出新的权威信号。
    ///
    /// # Logic
    /// 1. 方向按原文子串映射，原文缺省判定为观望。
    /// 2. 置信度取整并钳制到 0-100，缺省取 0。
    /// 3. 交易对取服务回显的非空值，否则沿用请求前的值。
    /// 4. 时间周期按协议值解析，解析失败视同缺省。
    /// 5. 理由说明缺省时沿用请求前的说明。
    ///
    /// # Arguments
    /// * `response`: 服务返回的原始载荷。
    /// * `now`: 合并时刻，作为新信号的生成时间。
    ///
    /// # Returns
    /// 合并后的完整信号，`self` 仅作为各字段的回退来源。
    pub fn merge_response(&self, response: &SignalResponse, now: DateTime<Utc>) -> Self {
        let direction = response
            .signal
            .as_deref()
            .map(Direction::from_service)
            .unwrap_or(Direction::Hold);
        let confidence = response.confidence.map(clamp_confidence).unwrap_or(0);
        let pair = response
            .pair
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.pair.clone());
        let timeframe = response
            .timeframe
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(self.timeframe);
        let rationale = response
            .note
            .clone()
            .unwrap_or_else(|| self.rationale.clone());

        Self {
            direction,
            confidence,
            pair,
            timeframe,
            rationale,
            issued_at: now,
        }
    }

    /// # Summary
    /// 请求失败时的兜底信号：观望、零置信度、固定文案。
    ///
    /// # Invariants
    /// - 交易对、时间周期与生成时刻保持请求前的值不变。
    pub fn service_unreachable(&self) -> Self {
        Self {
            direction: Direction::Hold,
            confidence: 0,
            pair: self.pair.clone(),
            timeframe: self.timeframe,
            rationale: UNREACHABLE_RATIONALE.to_string(),
            issued_at: self.issued_at,
        }
    }
}

fn clamp_confidence(raw: f64) -> u8 {
    if !raw.is_finite() || raw <= 0.0 {
        0
    } else if raw >= 100.0 {
        100
    } else {
        raw.round() as u8
    }
}

/// # Summary
/// 信号状态广播事件，协调器向视图层扇出的载荷。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalEvent {
    // 请求已进入在途状态
    Requesting,
    // 权威信号被整体替换（成功合并、失败兜底或即时回显）
    Updated(TradeSignal),
}

/// # Summary
/// `generate` 触发的受理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    // 新请求已受理并进入在途状态
    Started,
    // 已有请求在途，本次触发被忽略
    AlreadyRequesting,
}
