use crate::indicators::IndicatorEngine;
use crate::window::CandleWindow;
use futures::StreamExt;
use kehai_core::config::MarketConfig;
use kehai_core::market::entity::{Candle, IndicatorSnapshot, MarketEvent};
use kehai_core::market::error::MarketError;
use kehai_core::market::port::{CandleSource, MarketEventStream, OscillatorSink};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// # Summary
/// 市场会话：行情流的生命周期控制器与扇出中心。
///
/// # Invariants
/// - 同一会话至多存在一个在跑的实时任务（重复 `start` 不会叠加节拍）。
/// - `stop` 返回后不再发布任何事件，窗口内容保留。
/// - 每个广播出去的 `Tick` 都携带同一根 K 线入窗后重算的指标。
pub struct MarketSession {
    // 行情数据源
    source: Arc<dyn CandleSource>,
    // 指标引擎
    engine: IndicatorEngine,
    // 启动时预生成的种子数量
    seed_candles: usize,
    // 事件广播器
    events: broadcast::Sender<MarketEvent>,
    // 窗口与运行状态
    state: Mutex<SessionState>,
}

struct SessionState {
    // 滚动窗口
    window: CandleWindow,
    // 最近一次重算或覆盖后的指标
    indicators: IndicatorSnapshot,
    // 实时任务是否在跑
    running: bool,
    // 实时任务句柄
    live_task: Option<AbortHandle>,
}

impl MarketSession {
    /// # Summary
    /// 创建会话实例。
    ///
    /// # Logic
    /// 1. 按配置容量初始化空窗口与中性指标。
    /// 2. 创建广播通道备用。
    ///
    /// # Arguments
    /// * `source`: K 线数据源端口。
    /// * `cfg`: 行情配置。
    ///
    /// # Returns
    /// 返回会话实例的强引用 Arc。
    pub fn new(source: Arc<dyn CandleSource>, cfg: &MarketConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(128);
        Arc::new(Self {
            source,
            engine: IndicatorEngine::new(),
            seed_candles: cfg.seed_candles,
            events,
            state: Mutex::new(SessionState {
                window: CandleWindow::new(cfg.capacity),
                indicators: IndicatorSnapshot::neutral(),
                running: false,
                live_task: None,
            }),
        })
    }

    /// # Summary
    /// 启动行情流。幂等：已在跑时直接返回。
    ///
    /// # Logic
    /// 1. 占位运行标志；首次启动时同步生成种子历史，
    ///    逐根走与实时路径相同的入窗-重算-广播流程。
    /// 2. 订阅数据源实时流，失败则回滚运行标志。
    /// 3. 启动实时任务，持有会话的弱引用以免阻止回收。
    ///
    /// # Returns
    /// 成功返回 Ok，数据源拒绝订阅时返回 MarketError。
    pub async fn start(self: &Arc<Self>) -> Result<(), MarketError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.running {
                debug!("market session already running");
                return Ok(());
            }
            state.running = true;

            // 只在窗口为空时播种，stop 后重启直接续用已有窗口
            if state.window.is_empty() && self.seed_candles > 0 {
                for candle in self.source.history(self.seed_candles) {
                    Self::ingest(&self.engine, &self.events, &mut state, candle);
                }
                info!(
                    "market session seeded {} candles",
                    state.window.len()
                );
            }
        }

        let stream = match self.source.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                state.running = false;
                return Err(e);
            }
        };

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut stream = stream;
            while let Some(candle) = stream.next().await {
                let Some(session) = weak.upgrade() else { break };
                if !session.ingest_live(candle) {
                    break;
                }
            }
            debug!("market session live loop ended");
        });

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.live_task = Some(handle.abort_handle());
        info!("market session started");
        Ok(())
    }

    /// # Summary
    /// 停止行情流。空闲时为无害的空操作。
    ///
    /// # Logic
    /// 1. 在锁内清除运行标志并取走任务句柄，因此本方法返回后
    ///    实时任务不可能再发布事件。
    /// 2. 中止实时任务，窗口与订阅者保持原样。
    pub fn stop(&self) {
        let handle = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !state.running {
                return;
            }
            state.running = false;
            state.live_task.take()
        };

        if let Some(handle) = handle {
            handle.abort();
        }
        info!("market session stopped");
    }

    /// # Summary
    /// 订阅行情事件流。
    ///
    /// # Logic
    /// 挂载到内部广播器并桥接为异步流；订阅落后太多时丢弃
    /// 跳过的事件继续读取，而不是终止流。
    ///
    /// # Returns
    /// 异步行情事件流。
    pub fn subscribe(&self) -> MarketEventStream {
        let rx = self.events.subscribe();
        let stream = async_stream::stream! {
            let mut rx = rx;
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("market subscriber lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Box::pin(stream)
    }

    /// # Summary
    /// 读取当前窗口与指标的一致快照（晚到订阅者的补读入口）。
    ///
    /// # Returns
    /// 窗口内全部 K 线的有序克隆与最新指标。
    pub fn snapshot(&self) -> (Vec<Candle>, IndicatorSnapshot) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        (state.window.to_vec(), state.indicators)
    }

    /// 实时任务是否在跑
    pub fn is_running(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.running
    }

    /// # Summary
    /// 实时路径的单根入窗处理。
    ///
    /// # Logic
    /// 在锁内检查运行标志后走公共入窗流程；标志已清除时返回
    /// false 通知实时任务退出。
    fn ingest_live(&self, candle: Candle) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.running {
            return false;
        }
        Self::ingest(&self.engine, &self.events, &mut state, candle);
        true
    }

    /// # Summary
    /// 公共入窗流程：push、整窗重算、广播。
    ///
    /// # Invariants
    /// - 广播动作与状态更新在同一把锁内完成，事件顺序与窗口
    ///   变更顺序一致。
    fn ingest(
        engine: &IndicatorEngine,
        events: &broadcast::Sender<MarketEvent>,
        state: &mut SessionState,
        candle: Candle,
    ) {
        state.window.push(candle.clone());
        state.indicators = engine.compute(&state.window);
        let _ = events.send(MarketEvent::Tick {
            candle,
            indicators: state.indicators,
        });
    }
}

impl OscillatorSink for MarketSession {
    /// # Summary
    /// 用外部信号服务给出的震荡值覆盖当前快照并广播。
    ///
    /// # Logic
    /// 只改写震荡值，两条均线保持最近一次重算的结果；下一个
    /// 节拍的整窗重算会再次覆盖它（后写者胜）。
    fn apply_oscillator(&self, value: f64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.indicators.oscillator = value;
        debug!("oscillator overridden to {}", value);
        let _ = self.events.send(MarketEvent::IndicatorsOverride {
            indicators: state.indicators,
        });
    }
}
