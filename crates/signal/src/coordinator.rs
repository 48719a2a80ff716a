use chrono::Utc;
use kehai_core::common::TimeFrame;
use kehai_core::market::port::OscillatorSink;
use kehai_core::signal::entity::{RequestOutcome, SignalEvent, SignalResponse, TradeSignal};
use kehai_core::signal::error::SignalError;
use kehai_core::signal::port::{SignalEventStream, SignalProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// # Summary
/// 信号请求协调器：忙闲状态机与权威信号的唯一写入方。
///
/// # Invariants
/// - 全局至多一个在途请求；在途期间重复触发被直接忽略。
/// - 每个在途请求必然以整体替换权威信号收尾（成功合并或失败兜底），
///   不存在半更新状态，也不会停留在在途标志上。
/// - 未配置服务端点时 `generate` 在任何状态变更之前被拒绝，
///   忙闲标志保持不变。
pub struct SignalCoordinator {
    // 信号服务端口；None 表示未配置，动作被结构性禁用
    provider: Option<Arc<dyn SignalProvider>>,
    // 行情侧震荡值回写端口
    sink: Mutex<Option<Arc<dyn OscillatorSink>>>,
    // 事件广播器
    events: broadcast::Sender<SignalEvent>,
    // 当前权威信号
    current: Mutex<TradeSignal>,
    // 在途标志
    busy: AtomicBool,
}

impl SignalCoordinator {
    /// # Summary
    /// 创建协调器，权威信号初始化为观望占位。
    ///
    /// # Arguments
    /// * `provider`: 信号服务端口，未配置时传 None。
    /// * `pair`: 默认交易对。
    /// * `timeframe`: 默认时间周期。
    ///
    /// # Returns
    /// 返回协调器实例的强引用 Arc。
    pub fn new(
        provider: Option<Arc<dyn SignalProvider>>,
        pair: impl Into<String>,
        timeframe: TimeFrame,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            provider,
            sink: Mutex::new(None),
            events,
            current: Mutex::new(TradeSignal::waiting(pair, timeframe, Utc::now())),
            busy: AtomicBool::new(false),
        })
    }

    /// # Summary
    /// 注册行情侧的震荡值回写端口。
    ///
    /// # Arguments
    /// * `sink`: 回写端口实现（通常是市场会话）。
    pub fn set_oscillator_sink(&self, sink: Arc<dyn OscillatorSink>) {
        let mut slot = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(sink);
    }

    /// # Summary
    /// 触发一次信号请求。
    ///
    /// # Logic
    /// 1. 端点未配置时直接拒绝，不触碰任何状态。
    /// 2. 以 CAS 抢占在途标志，失败说明已有请求在途，本次忽略。
    /// 3. 快照请求前的权威信号，广播在途事件后把请求放入后台任务，
    ///    因此调用方无法中途取消，请求必然走到合并或兜底。
    ///
    /// # Returns
    /// 受理结果；端点未配置时返回 `SignalError::NotConfigured`。
    pub fn generate(self: &Arc<Self>) -> Result<RequestOutcome, SignalError> {
        let Some(provider) = self.provider.clone() else {
            return Err(SignalError::NotConfigured);
        };

        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("signal request already in flight, trigger ignored");
            return Ok(RequestOutcome::AlreadyRequesting);
        }

        // 请求途中用户仍可改交易对/周期；合并回退一律以这份快照为准
        let pre = {
            let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            current.clone()
        };
        let _ = self.events.send(SignalEvent::Requesting);
        info!("signal request started for {} @ {}", pre.pair, pre.timeframe);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = provider.fetch_signal(&pre.pair, pre.timeframe).await;
            this.complete(pre, result);
        });

        Ok(RequestOutcome::Started)
    }

    /// # Summary
    /// 修改交易对并即时回显到权威信号，不发起新请求。
    ///
    /// # Arguments
    /// * `input`: 自由文本标识，先做 trim。
    ///
    /// # Returns
    /// trim 后为空返回 false 且状态不变，否则返回 true。
    pub fn set_pair(&self, input: &str) -> bool {
        let pair = input.trim();
        if pair.is_empty() {
            return false;
        }

        let updated = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            current.pair = pair.to_string();
            current.clone()
        };
        let _ = self.events.send(SignalEvent::Updated(updated));
        true
    }

    /// # Summary
    /// 修改时间周期并即时回显到权威信号，不发起新请求。
    ///
    /// # Arguments
    /// * `timeframe`: 新的时间周期。
    pub fn set_timeframe(&self, timeframe: TimeFrame) {
        let updated = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            current.timeframe = timeframe;
            current.clone()
        };
        let _ = self.events.send(SignalEvent::Updated(updated));
    }

    /// 当前权威信号的克隆
    pub fn current(&self) -> TradeSignal {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.clone()
    }

    /// 是否有请求在途
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// 信号动作是否已配置可用
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// # Summary
    /// 订阅信号事件流。
    ///
    /// # Logic
    /// 挂载到内部广播器并桥接为异步流；订阅落后太多时丢弃
    /// 跳过的事件继续读取，而不是终止流。
    ///
    /// # Returns
    /// 异步信号事件流。
    pub fn subscribe(&self) -> SignalEventStream {
        let rx = self.events.subscribe();
        let stream = async_stream::stream! {
            let mut rx = rx;
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("signal subscriber lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Box::pin(stream)
    }

    /// # Summary
    /// 请求收尾：合并或兜底、回写震荡值、释放在途标志并广播。
    ///
    /// # Logic
    /// 1. 成功时把响应合并到请求前快照；携带数值震荡值则同时经
    ///    端口回写行情视图（与周期重算后写者胜）。
    /// 2. 失败时记录告警并落到固定文案的观望兜底。
    /// 3. 先整体替换权威信号、清除在途标志，再广播替换事件，
    ///    订阅者看到事件时状态机必然已回到空闲。
    fn complete(&self, pre: TradeSignal, result: Result<SignalResponse, SignalError>) {
        let next = match result {
            Ok(response) => {
                if let Some(rsi) = response.rsi {
                    let sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
                    if let Some(sink) = sink.as_ref() {
                        sink.apply_oscillator(rsi);
                    }
                }
                let merged = pre.merge_response(&response, Utc::now());
                info!(
                    "signal request completed: {} ({}%)",
                    merged.direction, merged.confidence
                );
                merged
            }
            Err(e) => {
                warn!("signal request failed, falling back to HOLD: {}", e);
                pre.service_unreachable()
            }
        };

        {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            *current = next.clone();
        }
        self.busy.store(false, Ordering::SeqCst);
        let _ = self.events.send(SignalEvent::Updated(next));
    }
}
