use crate::common::TimeFrame;
use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub signal: SignalConfig,
}

/// 行情模拟与滚动窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    // 默认交易对标识
    pub pair: String,
    // 默认时间周期
    pub timeframe: TimeFrame,
    // 滚动窗口容量（根）
    pub capacity: usize,
    // 启动时预生成的历史 K 线数量
    pub seed_candles: usize,
    // 节拍间隔（毫秒）
    pub tick_ms: u64,
    // 模拟价格序列的起始收盘价
    pub start_price: f64,
}

/// 外部信号服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    // 服务基地址，留空表示未接入信号服务
    pub base_url: String,
    // 单次请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            signal: SignalConfig::default(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            pair: "EURUSD_OTC".to_string(),
            timeframe: TimeFrame::Sec5,
            capacity: 100,
            seed_candles: 50,
            tick_ms: 1000,
            start_price: 1.085,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(), // Empty by default, must be set via config to enable requests
            timeout_secs: 10,
        }
    }
}
