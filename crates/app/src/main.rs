use std::sync::Arc;

use futures::StreamExt;
use kehai_core::common::TimeFrame;
use kehai_core::config::AppConfig;
use kehai_core::market::entity::MarketEvent;
use kehai_core::signal::entity::{RequestOutcome, SignalEvent};
use kehai_core::signal::error::SignalError;
use kehai_core::signal::port::SignalProvider;
use kehai_feed::sim::SimFeed;
use kehai_market::session::MarketSession;
use kehai_signal::coordinator::SignalCoordinator;
use kehai_signal::http::HttpSignalProvider;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并以 Arc<dyn Trait> 形式互相注入。
///
/// # Logic
/// 1. 初始化全局日志（终端 + 按日滚动文件）。
/// 2. 加载分层配置（默认值 <- 可选文件 <- 环境变量）。
/// 3. 实例化基础设施层（SimFeed）。
/// 4. 构造行情会话与信号协调器，注册震荡值回写端口。
/// 5. 挂起视图替身任务消费两路事件流。
/// 6. 以行式控制台承接用户动作，直到退出指令或外部信号。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 初始化日志
    let file_appender = tracing_appender::rolling::daily("logs", "kehai.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();
    info!("Kehai core starting...");

    // 2. 加载配置
    let cfg = load_config()?;
    info!(
        "config loaded: pair={} timeframe={} capacity={}",
        cfg.market.pair, cfg.market.timeframe, cfg.market.capacity
    );

    // 3. 实例化基础设施层
    let feed = Arc::new(SimFeed::new(&cfg.market));

    // 4. 构造行情会话与信号协调器
    let session = MarketSession::new(feed, &cfg.market);
    let provider: Option<Arc<dyn SignalProvider>> = if cfg.signal.base_url.trim().is_empty() {
        warn!("signal endpoint not configured, the generate action is disabled");
        None
    } else {
        Some(Arc::new(HttpSignalProvider::new(&cfg.signal)?))
    };
    let coordinator =
        SignalCoordinator::new(provider, cfg.market.pair.clone(), cfg.market.timeframe);
    coordinator.set_oscillator_sink(session.clone());

    // 5. 视图替身：消费事件流并渲染为日志行
    spawn_view(&session, &coordinator);

    session.start().await?;

    // 6. 控制台主循环
    run_console(&session, &coordinator).await?;

    session.stop();
    info!("Shutdown complete.");
    Ok(())
}

/// # Summary
/// 加载分层配置：代码默认值打底，`kehai.toml` 可选覆盖，
/// `KEHAI__` 前缀的环境变量优先级最高。
fn load_config() -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(config::File::with_name("kehai").required(false))
        .add_source(config::Environment::with_prefix("KEHAI").separator("__"))
        .build()?
        .try_deserialize()
}

/// # Summary
/// 挂起视图替身任务：真实部署里这两条流由展示层消费，
/// 这里渲染为结构化日志行。
fn spawn_view(session: &Arc<MarketSession>, coordinator: &Arc<SignalCoordinator>) {
    let mut market_events = session.subscribe();
    tokio::spawn(async move {
        while let Some(event) = market_events.next().await {
            match event {
                MarketEvent::Tick { candle, indicators } => info!(
                    "tick close={:.5} osc={:.2} ma={:.5} ema={:.5}",
                    candle.close,
                    indicators.oscillator,
                    indicators.moving_average,
                    indicators.secondary_average
                ),
                MarketEvent::IndicatorsOverride { indicators } => {
                    info!("oscillator override -> {:.2}", indicators.oscillator);
                }
            }
        }
    });

    let mut signal_events = coordinator.subscribe();
    tokio::spawn(async move {
        while let Some(event) = signal_events.next().await {
            match event {
                SignalEvent::Requesting => info!("signal: requesting..."),
                SignalEvent::Updated(signal) => info!(
                    "signal: {} {}% {} @ {} ({})",
                    signal.direction,
                    signal.confidence,
                    signal.pair,
                    signal.timeframe,
                    signal.rationale
                ),
            }
        }
    });
}

/// # Summary
/// 行式控制台：`gen` 触发信号请求，`pair <ID>` 与 `tf <周期>`
/// 即时回显到权威信号，`start`/`stop` 控制行情流，
/// `quit`、EOF 或 Ctrl-C 退出。
async fn run_console(
    session: &Arc<MarketSession>,
    coordinator: &Arc<SignalCoordinator>,
) -> Result<(), std::io::Error> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received.");
                return Ok(());
            }
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(()) };
                if !dispatch(session, coordinator, line.trim()).await {
                    return Ok(());
                }
            }
        }
    }
}

/// # Summary
/// 解析并执行一条控制台指令；返回 false 表示请求退出。
async fn dispatch(
    session: &Arc<MarketSession>,
    coordinator: &Arc<SignalCoordinator>,
    line: &str,
) -> bool {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "gen" => match coordinator.generate() {
            Ok(RequestOutcome::Started) => {}
            Ok(RequestOutcome::AlreadyRequesting) => {
                info!("a signal request is already in flight");
            }
            Err(SignalError::NotConfigured) => {
                warn!("signal endpoint not configured; set signal.base_url to enable");
            }
            Err(e) => warn!("signal request rejected: {}", e),
        },
        "pair" => {
            if !coordinator.set_pair(rest) {
                warn!("usage: pair <IDENTIFIER>");
            }
        }
        "tf" => match rest.parse::<TimeFrame>() {
            Ok(timeframe) => coordinator.set_timeframe(timeframe),
            Err(_) => warn!("usage: tf <5s|10s|15s|1m>"),
        },
        "start" => {
            if let Err(e) = session.start().await {
                warn!("failed to start market session: {}", e);
            }
        }
        "stop" => session.stop(),
        "quit" | "exit" => return false,
        "" => {}
        other => warn!("unknown command: {}", other),
    }
    true
}
