use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures::StreamExt;
use kehai_core::config::MarketConfig;
use kehai_core::market::entity::{Candle, MarketEvent};
use kehai_core::market::error::MarketError;
use kehai_core::market::port::{CandleSource, CandleStream, MarketEventStream, OscillatorSink};
use kehai_feed::sim::SimFeed;
use kehai_market::session::MarketSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn candle(close: f64, offset_secs: i64) -> Candle {
    Candle {
        time: Utc::now() + ChronoDuration::seconds(offset_secs),
        open: close,
        high: close + 0.0001,
        low: close - 0.0001,
        close,
        volume: 10,
    }
}

/// # Summary
/// 为测试提供的可控行情源：种子为确定的递增序列，实时流由
/// 测试端手工推送。
struct MockSource {
    // 实时推送入口
    candle_tx: mpsc::UnboundedSender<Candle>,
    // 用于内部消费流
    candle_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Candle>>>,
}

impl MockSource {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            candle_tx: tx,
            candle_rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }

    fn push(&self, candle: Candle) {
        let _ = self.candle_tx.send(candle);
    }
}

#[async_trait]
impl CandleSource for MockSource {
    fn history(&self, len: usize) -> Vec<Candle> {
        (0..len)
            .map(|i| candle(1.0 + 0.001 * i as f64, i as i64))
            .collect()
    }

    async fn subscribe(&self) -> Result<CandleStream, MarketError> {
        let rx = self.candle_rx.clone();
        let stream = async_stream::stream! {
            let mut rx = rx.lock().await;
            while let Some(candle) = rx.recv().await {
                yield candle;
            }
        };
        Ok(Box::pin(stream))
    }
}

/// # Summary
/// 拒绝订阅的行情源，用于启动失败路径。
struct FailingSource;

#[async_trait]
impl CandleSource for FailingSource {
    fn history(&self, _len: usize) -> Vec<Candle> {
        Vec::new()
    }

    async fn subscribe(&self) -> Result<CandleStream, MarketError> {
        Err(MarketError::Source("subscription refused".to_string()))
    }
}

fn test_config(seed_candles: usize) -> MarketConfig {
    MarketConfig {
        capacity: 100,
        seed_candles,
        ..MarketConfig::default()
    }
}

async fn next_event(stream: &mut MarketEventStream) -> MarketEvent {
    timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for market event")
        .expect("event stream closed unexpectedly")
}

async fn assert_quiet(stream: &mut MarketEventStream) {
    let quiet = timeout(Duration::from_millis(150), stream.next()).await;
    assert!(quiet.is_err(), "expected no further events, got {:?}", quiet);
}

#[tokio::test]
async fn test_start_seeds_window_and_broadcasts_in_order() {
    let session = MarketSession::new(Arc::new(MockSource::new()), &test_config(20));
    let mut stream = session.subscribe();

    session.start().await.unwrap();
    assert!(session.is_running());

    for i in 0..20 {
        match next_event(&mut stream).await {
            MarketEvent::Tick { candle, .. } => {
                let expected = 1.0 + 0.001 * i as f64;
                assert!(
                    (candle.close - expected).abs() < f64::EPSILON,
                    "seed tick {} out of order",
                    i
                );
            }
            other => panic!("expected Tick, got {:?}", other),
        }
    }

    let (window, _) = session.snapshot();
    assert_eq!(window.len(), 20);
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let source = Arc::new(MockSource::new());
    let session = MarketSession::new(source.clone(), &test_config(3));
    let mut stream = session.subscribe();

    session.start().await.unwrap();
    session.start().await.unwrap();

    // 消费 3 根种子
    for _ in 0..3 {
        next_event(&mut stream).await;
    }

    // 只有一个实时任务在消费，推送一根只能产生一条事件
    source.push(candle(2.0, 100));
    match next_event(&mut stream).await {
        MarketEvent::Tick { candle, .. } => assert!((candle.close - 2.0).abs() < f64::EPSILON),
        other => panic!("expected Tick, got {:?}", other),
    }
    assert_quiet(&mut stream).await;
}

#[tokio::test]
async fn test_stop_halts_events_and_keeps_window() {
    let source = Arc::new(MockSource::new());
    let session = MarketSession::new(source.clone(), &test_config(5));
    let mut stream = session.subscribe();

    session.start().await.unwrap();
    for _ in 0..5 {
        next_event(&mut stream).await;
    }

    session.stop();
    assert!(!session.is_running());

    // stop 返回后推送不再产生事件，窗口保持原样
    source.push(candle(9.0, 200));
    assert_quiet(&mut stream).await;

    let (window, _) = session.snapshot();
    assert_eq!(window.len(), 5);

    // 空闲时再次 stop 是无害的空操作
    session.stop();
}

#[tokio::test]
async fn test_indicators_turn_live_at_minimum_samples() {
    let session = MarketSession::new(Arc::new(MockSource::new()), &test_config(14));
    let mut stream = session.subscribe();

    session.start().await.unwrap();

    let mut snapshots = Vec::new();
    for _ in 0..14 {
        match next_event(&mut stream).await {
            MarketEvent::Tick { indicators, .. } => snapshots.push(indicators),
            other => panic!("expected Tick, got {:?}", other),
        }
    }

    // 第 13 根及之前样本不足，恒为中性基线
    assert!((snapshots[12].oscillator - 50.0).abs() < f64::EPSILON);
    assert!((snapshots[12].moving_average).abs() < f64::EPSILON);

    // 第 14 根起指标生效；种子严格递增，13 个上涨步进
    let live = snapshots[13];
    assert!(
        (59.5..=69.5).contains(&live.oscillator),
        "oscillator {} escaped the all-gains envelope",
        live.oscillator
    );
    assert!(live.moving_average > 1.0);
    assert!(live.secondary_average > 1.0);
}

#[tokio::test]
async fn test_oscillator_override_is_last_writer_until_next_tick() {
    let source = Arc::new(MockSource::new());
    let session = MarketSession::new(source.clone(), &test_config(14));
    let mut stream = session.subscribe();

    session.start().await.unwrap();
    let mut last_tick = None;
    for _ in 0..14 {
        if let MarketEvent::Tick { indicators, .. } = next_event(&mut stream).await {
            last_tick = Some(indicators);
        }
    }
    let last_tick = last_tick.expect("no tick indicators seen");

    // 覆盖只改震荡值，均线沿用最近一次重算
    session.apply_oscillator(88.5);
    match next_event(&mut stream).await {
        MarketEvent::IndicatorsOverride { indicators } => {
            assert!((indicators.oscillator - 88.5).abs() < f64::EPSILON);
            assert!((indicators.moving_average - last_tick.moving_average).abs() < f64::EPSILON);
        }
        other => panic!("expected IndicatorsOverride, got {:?}", other),
    }
    let (_, snapshot) = session.snapshot();
    assert!((snapshot.oscillator - 88.5).abs() < f64::EPSILON);

    // 下一个节拍整窗重算，覆盖值被冲掉（88.5 在重算值域之外）
    source.push(candle(1.2, 300));
    match next_event(&mut stream).await {
        MarketEvent::Tick { indicators, .. } => {
            assert!((indicators.oscillator - 88.5).abs() > f64::EPSILON);
        }
        other => panic!("expected Tick, got {:?}", other),
    }
}

#[tokio::test]
async fn test_start_failure_rolls_back_running_flag() {
    let session = MarketSession::new(Arc::new(FailingSource), &test_config(0));

    let result = session.start().await;
    assert!(matches!(result, Err(MarketError::Source(_))));
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_end_to_end_with_sim_feed() {
    let cfg = MarketConfig {
        seed_candles: 5,
        tick_ms: 20,
        ..MarketConfig::default()
    };
    let feed = Arc::new(SimFeed::with_seed(&cfg, 21));
    let session = MarketSession::new(feed, &cfg);
    let mut stream = session.subscribe();

    session.start().await.unwrap();

    // 5 根种子加 3 根实时，价格路径必须全程连续
    let mut closes = Vec::new();
    let mut opens = Vec::new();
    for _ in 0..8 {
        if let MarketEvent::Tick { candle, .. } = next_event(&mut stream).await {
            opens.push(candle.open);
            closes.push(candle.close);
        }
    }

    for i in 1..opens.len() {
        assert!(
            (opens[i] - closes[i - 1]).abs() < f64::EPSILON,
            "price path broke between tick {} and {}",
            i - 1,
            i
        );
    }

    session.stop();
    let (window, _) = session.snapshot();
    assert!(window.len() >= 8, "window lost ticks: {}", window.len());
}
