use crate::window::CandleWindow;
use kehai_core::market::entity::IndicatorSnapshot;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

// 指标计算的最小样本数（取样的尾部根数）
const PERIOD: usize = 14;
// PERIOD 的浮点表示
const PERIOD_F: f64 = 14.0;
// 震荡值基线
const OSC_BASE: f64 = 40.0;
// 震荡值随机抖动幅度
const OSC_JITTER: f64 = 10.0;
// 每个上涨步进给震荡值的奖励
const GAIN_BONUS: f64 = 1.5;
// 指数平滑系数 alpha = 2 / (period + 1)
const EMA_ALPHA: f64 = 2.0 / 15.0;

/// # Summary
/// 指标引擎，对滚动窗口整体重算一份指标快照。
///
/// # Invariants
/// - 除震荡值的抖动项外无任何隐藏状态，同一窗口两次计算的
///   均线结果完全一致。
/// - 样本不足 `PERIOD` 根时恒返回 `IndicatorSnapshot::neutral()`。
/// - 无上涨步进时震荡值落在 `[40, 50]`，全上涨时不超过 `69.5`。
pub struct IndicatorEngine {
    // 抖动项随机数发生器
    rng: Mutex<StdRng>,
}

impl IndicatorEngine {
    /// # Summary
    /// 以随机种子创建指标引擎。
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// # Summary
    /// 以固定种子创建指标引擎，抖动序列可复现。
    ///
    /// # Arguments
    /// * `seed`: 随机数种子。
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// # Summary
    /// 对窗口计算指标快照。
    ///
    /// # Logic
    /// 1. 样本不足 `PERIOD` 根时返回中性基线（保护性默认，不是错误）。
    /// 2. 取尾部 `PERIOD` 根收盘价，统计严格上涨的相邻步进数。
    /// 3. 震荡值 = 基线 + 抖动 + 步进奖励，保留 2 位小数。
    /// 4. 主均线取这段收盘价的算术平均，次均线做指数平滑，各保留 5 位小数。
    ///
    /// # Arguments
    /// * `window`: 当前滚动窗口。
    ///
    /// # Returns
    /// 重算后的指标快照。
    pub fn compute(&self, window: &CandleWindow) -> IndicatorSnapshot {
        if window.len() < PERIOD {
            return IndicatorSnapshot::neutral();
        }

        let closes = window.trailing_closes(PERIOD);

        let mut gains = 0.0;
        for pair in closes.windows(2) {
            if pair[1] > pair[0] {
                gains += 1.0;
            }
        }

        let jitter = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.r#gen::<f64>()
        };
        let oscillator = OSC_BASE + jitter * OSC_JITTER + gains * GAIN_BONUS;

        let sum: f64 = closes.iter().sum();
        let moving_average = sum / PERIOD_F;

        let mut secondary = closes[0];
        for close in closes.iter().skip(1) {
            secondary += EMA_ALPHA * (close - secondary);
        }

        IndicatorSnapshot {
            oscillator: round_scaled(oscillator, 100.0),
            moving_average: round_scaled(moving_average, 100_000.0),
            secondary_average: round_scaled(secondary, 100_000.0),
        }
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

// 按倍率四舍五入：100 对应 2 位小数，100_000 对应 5 位小数
fn round_scaled(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}
