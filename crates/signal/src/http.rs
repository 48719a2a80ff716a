use async_trait::async_trait;
use kehai_core::common::TimeFrame;
use kehai_core::config::SignalConfig;
use kehai_core::signal::entity::SignalResponse;
use kehai_core::signal::error::SignalError;
use kehai_core::signal::port::SignalProvider;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

// 信号服务的固定查询路径
const SIGNAL_PATH: &str = "/signal_api/signal";

/// # Summary
/// 外部信号服务的 HTTP 适配器实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，内置请求超时，不会无限阻塞。
/// - 查询参数由传输层负责 URL 转义。
#[derive(Clone)]
pub struct HttpSignalProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 服务基地址（已去除尾部斜杠）
    base_url: String,
}

impl HttpSignalProvider {
    /// # Summary
    /// 按配置创建 HTTP 信号适配器。
    ///
    /// # Logic
    /// 1. 基地址去除首尾空白与尾部斜杠；为空视为未配置，直接拒绝。
    /// 2. 确保进程级 rustls 加密 provider 已安装（ring，重复安装忽略）。
    /// 3. 按配置的秒数设置请求超时后初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `cfg`: 信号服务配置。
    ///
    /// # Returns
    /// 成功返回适配器实例，基地址为空返回 `SignalError::NotConfigured`。
    pub fn new(cfg: &SignalConfig) -> Result<Self, SignalError> {
        let base_url = cfg.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SignalError::NotConfigured);
        }

        // reqwest 的 rustls-no-provider 要求进程级加密 provider 先就位；
        // 只能安装一次，已有 provider 时忽略本次安装
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| SignalError::Network(e.to_string()))?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl SignalProvider for HttpSignalProvider {
    /// # Summary
    /// 向信号服务查询一次交易建议。
    ///
    /// # Logic
    /// 1. 拼接固定查询路径，携带 `pair` 与 `timeframe` 查询参数。
    /// 2. 网络层错误映射为 `Network`，非 2xx 状态码同样视为网络失败。
    /// 3. 响应体按可全缺省的载荷结构反序列化，失败映射为 `Parse`。
    ///
    /// # Arguments
    /// * `pair`: 交易对标识。
    /// * `timeframe`: 时间周期。
    ///
    /// # Returns
    /// 成功返回原始响应载荷，失败返回 SignalError。
    async fn fetch_signal(
        &self,
        pair: &str,
        timeframe: TimeFrame,
    ) -> Result<SignalResponse, SignalError> {
        let url = format!("{}{}", self.base_url, SIGNAL_PATH);
        let timeframe = timeframe.to_string();
        debug!("requesting signal for {} @ {}", pair, timeframe);

        let resp = self
            .client
            .get(&url)
            .query(&[("pair", pair), ("timeframe", timeframe.as_str())])
            .send()
            .await
            .map_err(|e| SignalError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SignalError::Network(format!("HTTP {}", resp.status())));
        }

        resp.json::<SignalResponse>()
            .await
            .map_err(|e| SignalError::Parse(e.to_string()))
    }
}
