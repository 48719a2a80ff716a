use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use kehai_core::config::MarketConfig;
use kehai_core::market::entity::Candle;
use kehai_core::market::error::MarketError;
use kehai_core::market::port::{CandleSource, CandleStream};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

// 单次节拍的价格扰动全宽（零均值均匀分布）
const VOLATILITY: f64 = 0.0002;
// 影线最大延伸幅度
const WICK: f64 = 0.0001;
// 单根 K 线成交量上限（不含）
const MAX_VOLUME: i64 = 1000;

/// # Summary
/// 合成行情数据源，按固定节拍产出连续随机游走的 K 线序列。
///
/// # Invariants
/// - `last_close` 是价格连续性的唯一事实来源，每生成一根即被推进，
///   因此种子历史与其后的实时流之间无价格跳变。
/// - 使用 `StdRng`，固定种子时整条序列可完全复现。
#[derive(Clone)]
pub struct SimFeed {
    inner: Arc<SimState>,
}

struct SimState {
    // 节拍间隔（tokio 计时用）
    tick: Duration,
    // 同一间隔的 chrono 表示，用于种子时间戳回溯
    step: ChronoDuration,
    // 最近一根 K 线的收盘价
    last_close: Mutex<f64>,
    // 随机数发生器
    rng: Mutex<StdRng>,
}

impl SimFeed {
    /// # Summary
    /// 以随机种子创建模拟行情源。
    ///
    /// # Arguments
    /// * `cfg`: 行情配置，提供起始价与节拍间隔。
    ///
    /// # Returns
    /// 返回初始化后的 SimFeed。
    pub fn new(cfg: &MarketConfig) -> Self {
        Self::with_seed(cfg, rand::random())
    }

    /// # Summary
    /// 以固定种子创建模拟行情源，序列可复现。
    ///
    /// # Arguments
    /// * `cfg`: 行情配置。
    /// * `seed`: 随机数种子。
    ///
    /// # Returns
    /// 返回初始化后的 SimFeed。
    pub fn with_seed(cfg: &MarketConfig, seed: u64) -> Self {
        let tick_ms = i64::try_from(cfg.tick_ms).unwrap_or(1000);
        Self {
            inner: Arc::new(SimState {
                tick: Duration::from_millis(cfg.tick_ms),
                step: ChronoDuration::milliseconds(tick_ms),
                last_close: Mutex::new(cfg.start_price),
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            }),
        }
    }

    /// # Summary
    /// 生成下一根 K 线并推进内部收盘价。
    ///
    /// # Logic
    /// 1. 开盘价取上一根的收盘价。
    /// 2. 收盘价叠加一次零均值扰动，并回写为新的 `last_close`。
    /// 3. 在实体价差外再延伸随机上下影线。
    ///
    /// # Arguments
    /// * `time`: 本根 K 线的开始时间。
    ///
    /// # Returns
    /// 满足 `low <= min(open, close) <= max(open, close) <= high` 的 K 线。
    fn next_candle(&self, time: DateTime<Utc>) -> Candle {
        let mut rng = self.inner.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut last_close = self
            .inner
            .last_close
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let open = *last_close;
        let change = (rng.r#gen::<f64>() - 0.5) * VOLATILITY;
        let close = open + change;
        let high = open.max(close) + rng.r#gen::<f64>() * WICK;
        let low = open.min(close) - rng.r#gen::<f64>() * WICK;
        let volume = rng.gen_range(0..MAX_VOLUME);
        *last_close = close;

        Candle {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

#[async_trait]
impl CandleSource for SimFeed {
    /// # Summary
    /// 生成一段历史种子 K 线。
    ///
    /// # Logic
    /// 1. 从 `now - len * step` 起逐根生成，时间按节拍递增。
    /// 2. 最后一根落在 `now - step`，与实时流的第一根正好衔接。
    ///
    /// # Arguments
    /// * `len`: 生成的 K 线数量。
    ///
    /// # Returns
    /// 按时间升序排列的 K 线列表。
    fn history(&self, len: usize) -> Vec<Candle> {
        let now = Utc::now();
        let count = i32::try_from(len).unwrap_or(i32::MAX);
        let mut current = now - self.inner.step * count;

        let mut history = Vec::with_capacity(len);
        for _ in 0..len {
            history.push(self.next_candle(current));
            current += self.inner.step;
        }
        history
    }

    /// # Summary
    /// 订阅实时 K 线流。
    ///
    /// # Logic
    /// 1. 创建异步通道 (mpsc)。
    /// 2. 启动后台节拍任务，每个间隔生成一根新 K 线并推入通道。
    /// 3. 订阅方丢弃流后通道关闭，任务随之退出。
    ///
    /// # Returns
    /// 成功返回异步 K 线流 `CandleStream`。
    async fn subscribe(&self) -> Result<CandleStream, MarketError> {
        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let feed = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(feed.inner.tick);
            // interval 的第一次 tick 立即完成，跳过以保持整拍间隔
            interval.tick().await;
            debug!("sim feed producer started");

            loop {
                interval.tick().await;
                let candle = feed.next_candle(Utc::now());
                if tx.send(candle).await.is_err() {
                    debug!("sim feed producer stopped: subscriber gone");
                    return;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
